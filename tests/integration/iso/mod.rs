//! ISO image integration tests
//!
//! Reading real ISO9660 images through `IsoSource`. `fixtures/dist1.iso` is a plain
//! level-1 image (no Rock Ridge, no Joliet) holding `/DIST1/T001.IPL;1`,
//! `/DIST1/V001.ZIP;1` (one deflated entry `V001`) and `/README.TXT;1`.
//!
//! The end-to-end run against a distribution image needs the Hercules tools and an
//! image named by `ADCDUTIL_TEST_ISO`, so it is behind the `hercules` feature.

#[cfg(test)]
mod tests {
    use crate::integration::common::{dir_listing, toolchain, FakeRunner};
    use adcdutil::disc::locate;
    use adcdutil::{
        Catalog, ConvertOptions, DiscSource, IsoSource, MediaError, Notifier, Pipeline,
        UnitKind,
    };
    use std::fs;
    use std::io::Read;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn fixture() -> IsoSource {
        IsoSource::new(
            PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/integration/fixtures/dist1.iso"),
        )
    }

    fn read_unit(source: &IsoSource, distribution: &str, unit: &str, kind: UnitKind) -> Vec<u8> {
        let disc = source.open().expect("Fixture should open");
        let mut data = Vec::new();
        locate(disc.as_ref(), distribution, unit, kind.extension())
            .expect("Unit should be found")
            .read_to_end(&mut data)
            .expect("Unit should be readable");
        data
    }

    #[test]
    fn test_catalog_of_fixture_image() {
        let catalog = Catalog::from_source(&fixture()).unwrap();

        assert_eq!(
            catalog.dump_lines(),
            vec!["DIST1 tapes: T001", "DIST1 volumes: V001"]
        );
        // README.TXT sits in the root and is not a unit
        assert_eq!(catalog.distributions().len(), 1);
    }

    #[test]
    fn test_locate_reads_file_bytes() {
        let source = fixture();
        assert_eq!(read_unit(&source, "DIST1", "T001", UnitKind::Tape), b"tape T001\n");

        let archive = read_unit(&source, "DIST1", "V001", UnitKind::Volume);
        assert!(archive.starts_with(b"PK\x03\x04"), "V001.ZIP should be a ZIP archive");
    }

    #[test]
    fn test_locate_ignores_case_of_directory_and_file() {
        let source = fixture();
        assert_eq!(read_unit(&source, "dist1", "t001", UnitKind::Tape), b"tape T001\n");
    }

    #[test]
    fn test_locate_missing_unit_on_image() {
        let source = fixture();
        let disc = source.open().unwrap();
        match locate(disc.as_ref(), "DIST1", "T999", ".IPL") {
            Err(MediaError::MediaNotFound { path }) => assert_eq!(path, "/DIST1/T999.IPL"),
            Err(other) => panic!("expected MediaNotFound, got {:?}", other),
            Ok(_) => panic!("T999 is not on the image"),
        };
    }

    #[test]
    fn test_convert_fixture_image_with_fake_tools() {
        let dest = TempDir::new().unwrap();
        let pipeline = Pipeline::new(fixture(), Notifier::quiet());
        let runner = FakeRunner::new();

        let summary = pipeline
            .convert_with(&ConvertOptions::new(dest.path()), &toolchain(), &runner)
            .unwrap();

        assert_eq!(summary.tapes, vec![dest.path().join("T001.het")]);
        assert_eq!(summary.volumes, vec![dest.path().join("V001.cckd")]);
        assert_eq!(dir_listing(dest.path()), vec!["T001.het", "V001.cckd"]);

        // The single ZIP entry is handed to dasdcopy as the volume image
        let calls = runner.calls();
        assert_eq!(calls[1].1[4], dest.path().join("V001").display().to_string());
    }

    #[test]
    fn test_missing_image_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let source = IsoSource::new(dir.path().join("absent.iso"));

        match source.open() {
            Err(MediaError::MediaRead { path, .. }) => {
                assert_eq!(path, dir.path().join("absent.iso"))
            }
            Err(other) => panic!("expected MediaRead, got {:?}", other),
            Ok(_) => panic!("opening a missing image should fail"),
        }
    }

    #[test]
    fn test_non_iso_file_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbage.iso");
        fs::write(&path, vec![0u8; 4096]).unwrap();

        let pipeline = Pipeline::new(IsoSource::new(&path), Notifier::quiet());
        assert!(matches!(
            pipeline.dump(),
            Err(MediaError::MediaRead { .. })
        ));
    }

    #[cfg(feature = "hercules")]
    #[test]
    fn test_convert_distribution_image() {
        use adcdutil::{ConvertOptions, SystemRunner, ToolNames};

        let Ok(image) = std::env::var("ADCDUTIL_TEST_ISO") else {
            println!("ADCDUTIL_TEST_ISO not set, skipping");
            return;
        };
        let dest = TempDir::new().unwrap();
        let pipeline = Pipeline::new(IsoSource::new(&image), Notifier::quiet());

        let lines = pipeline.dump().expect("Should list the distribution image");
        assert!(!lines.is_empty(), "Image should hold tapes or volumes");

        let summary = pipeline
            .convert(
                &ConvertOptions::new(dest.path()),
                &ToolNames::default(),
                &SystemRunner::default(),
            )
            .expect("Should convert every unit");

        let produced: Vec<_> = fs::read_dir(dest.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(produced.len(), summary.outputs().count());
        for output in summary.outputs() {
            assert!(output.exists(), "{} should exist", output.display());
        }
    }
}
