//! Pipeline integration tests
//!
//! Drives `Pipeline` from catalog to converted images with a fake disc and a fake
//! tool runner, checking outputs, external command lines and leftover files.

#[cfg(test)]
mod tests {
    use crate::integration::common::*;
    use adcdutil::{
        Compression, ConvertOptions, MediaError, Notifier, OutputFormat, Pipeline, ToolNames,
    };
    use std::fs;
    use tempfile::TempDir;

    fn sample_disc() -> FakeDisc {
        FakeDisc::new()
            .with_file("/DIST1/T001.IPL", b"tape T001")
            .with_file("/DIST1/V001.ZIP", &zip_bytes(&[("V001", b"volume V001")]))
    }

    #[test]
    fn test_dump_lists_tapes_and_volumes() {
        let pipeline = Pipeline::new(sample_disc(), Notifier::quiet());
        let lines = pipeline.dump().unwrap();
        assert_eq!(lines, vec!["DIST1 tapes: T001", "DIST1 volumes: V001"]);
    }

    #[test]
    fn test_dump_is_repeatable() {
        let disc = sample_disc()
            .with_file("/DIST2/B002.ZIP", &zip_bytes(&[("B002", b"b")]))
            .with_file("/DIST2/A001.ZIP", &zip_bytes(&[("A001", b"a")]))
            .with_file("/DIST0/T009.IPL", b"t");
        let pipeline = Pipeline::new(disc, Notifier::quiet());

        let first = pipeline.dump().unwrap();
        let second = pipeline.dump().unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first,
            vec![
                "DIST0 tapes: T009",
                "DIST1 tapes: T001",
                "DIST1 volumes: V001",
                "DIST2 volumes: A001 B002",
            ]
        );
    }

    #[test]
    fn test_convert_single_tape_and_volume() {
        let dest = TempDir::new().unwrap();
        let pipeline = Pipeline::new(sample_disc(), Notifier::quiet());
        let runner = FakeRunner::new();

        let summary = pipeline
            .convert_with(&ConvertOptions::new(dest.path()), &toolchain(), &runner)
            .unwrap();

        assert_eq!(summary.tapes, vec![dest.path().join("T001.het")]);
        assert_eq!(summary.volumes, vec![dest.path().join("V001.cckd")]);
        // No .IPL, .ZIP or raw image left behind
        assert_eq!(dir_listing(dest.path()), vec!["T001.het", "V001.cckd"]);

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "hetupd");
        assert_eq!(
            calls[0].1,
            vec![
                "-z".to_string(),
                dest.path().join("T001.IPL").display().to_string(),
                dest.path().join("T001.het").display().to_string(),
            ]
        );
        assert_eq!(calls[1].0, "dasdcopy");
        assert_eq!(
            calls[1].1,
            vec![
                "-q".to_string(),
                "-z".to_string(),
                "-o".to_string(),
                "CCKD".to_string(),
                dest.path().join("V001").display().to_string(),
                dest.path().join("V001.cckd").display().to_string(),
            ]
        );
    }

    #[test]
    fn test_convert_multi_file_volume() {
        let dest = TempDir::new().unwrap();
        let archive = zip_bytes(&[
            ("V002_2", b"second"),
            ("V002_1", b"first"),
            ("V002_3", b"third"),
        ]);
        let disc = FakeDisc::new().with_file("/DIST1/V002.ZIP", &archive);
        let pipeline = Pipeline::new(disc, Notifier::quiet());
        let runner = FakeRunner::new();

        let mut options = ConvertOptions::new(dest.path());
        options.compression = Compression::Bzip2;
        options.output_format = OutputFormat::Fba;

        let summary = pipeline
            .convert_with(&options, &toolchain(), &runner)
            .unwrap();
        assert_eq!(summary.volumes, vec![dest.path().join("V002.fba")]);
        assert_eq!(dir_listing(dest.path()), vec!["V002.fba"]);

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[0].1,
            vec![
                "-q".to_string(),
                "-lfs".to_string(),
                dest.path().join("V002_1").display().to_string(),
                dest.path().join("V002.img").display().to_string(),
            ]
        );
        assert_eq!(
            calls[1].1,
            vec![
                "-q".to_string(),
                "-bz2".to_string(),
                "-o".to_string(),
                "FBA".to_string(),
                dest.path().join("V002.img").display().to_string(),
                dest.path().join("V002.fba").display().to_string(),
            ]
        );
    }

    #[test]
    fn test_failed_join_stops_the_run_and_keeps_fragments() {
        let dest = TempDir::new().unwrap();
        let disc = FakeDisc::new()
            .with_file(
                "/DIST1/V002.ZIP",
                &zip_bytes(&[("V002_1", b"one"), ("V002_2", b"two")]),
            )
            .with_file("/DIST1/V003.ZIP", &zip_bytes(&[("V003", b"three")]));
        let pipeline = Pipeline::new(disc, Notifier::quiet());
        let runner = FakeRunner::failing_on_call(0);

        let result = pipeline.convert_with(&ConvertOptions::new(dest.path()), &toolchain(), &runner);

        assert!(matches!(result, Err(MediaError::ExternalTool { .. })));
        // V003 was never started
        assert_eq!(runner.calls().len(), 1);
        assert_eq!(dir_listing(dest.path()), vec!["V002_1", "V002_2"]);
    }

    #[test]
    fn test_existing_join_target_leaves_no_fragments() {
        let dest = TempDir::new().unwrap();
        fs::write(dest.path().join("V002.img"), b"previous run").unwrap();
        let disc = FakeDisc::new().with_file(
            "/DIST1/V002.ZIP",
            &zip_bytes(&[("V002_1", b"one"), ("V002_2", b"two")]),
        );
        let pipeline = Pipeline::new(disc, Notifier::quiet());
        let runner = FakeRunner::new();

        let result = pipeline.convert_with(&ConvertOptions::new(dest.path()), &toolchain(), &runner);

        assert!(matches!(result, Err(MediaError::PathExists { .. })));
        assert!(runner.calls().is_empty());
        assert_eq!(dir_listing(dest.path()), vec!["V002.img"]);
    }

    #[test]
    fn test_existing_output_without_force_aborts() {
        let dest = TempDir::new().unwrap();
        fs::write(dest.path().join("T001.het"), b"previous run").unwrap();

        let pipeline = Pipeline::new(sample_disc(), Notifier::quiet());
        let runner = FakeRunner::new();

        let result = pipeline.convert_with(&ConvertOptions::new(dest.path()), &toolchain(), &runner);

        assert!(matches!(result, Err(MediaError::PathExists { .. })));
        assert!(runner.calls().is_empty());
        assert_eq!(dir_listing(dest.path()), vec!["T001.het"]);
        assert_eq!(
            fs::read(dest.path().join("T001.het")).unwrap(),
            b"previous run"
        );
    }

    #[test]
    fn test_existing_output_with_force_is_replaced() {
        let dest = TempDir::new().unwrap();
        fs::write(dest.path().join("T001.het"), b"previous run").unwrap();
        fs::write(dest.path().join("V001.cckd"), b"previous run").unwrap();

        let pipeline = Pipeline::new(sample_disc(), Notifier::quiet());
        let runner = FakeRunner::new();
        let mut options = ConvertOptions::new(dest.path());
        options.overwrite = true;

        pipeline
            .convert_with(&options, &toolchain(), &runner)
            .unwrap();

        assert_eq!(dir_listing(dest.path()), vec!["T001.het", "V001.cckd"]);
        assert_eq!(
            fs::read(dest.path().join("T001.het")).unwrap(),
            b"hetupd output"
        );
        assert_eq!(runner.calls()[1].1[1], "-r");
    }

    #[test]
    fn test_missing_tools_fail_before_extraction() {
        let dest = TempDir::new().unwrap();
        let pipeline = Pipeline::new(sample_disc(), Notifier::quiet());
        let runner = FakeRunner::new();
        let names = ToolNames {
            dasdcopy: "adcdutil-test-no-dasdcopy".to_string(),
            hetupd: "adcdutil-test-no-hetupd".to_string(),
            unzip: "adcdutil-test-no-unzip".to_string(),
        };

        match pipeline.convert(&ConvertOptions::new(dest.path()), &names, &runner) {
            Err(MediaError::MissingTool { tools }) => assert_eq!(tools.len(), 3),
            other => panic!("expected MissingTool, got {:?}", other),
        }
        assert!(dir_listing(dest.path()).is_empty());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_disc_with_only_tapes_still_converts() {
        let dest = TempDir::new().unwrap();
        let disc = FakeDisc::new().with_file("/DIST1/T001.IPL", b"tape");
        let pipeline = Pipeline::new(disc, Notifier::quiet());
        let runner = FakeRunner::new();

        let summary = pipeline
            .convert_with(&ConvertOptions::new(dest.path()), &toolchain(), &runner)
            .unwrap();
        assert_eq!(summary.tapes.len(), 1);
        assert!(summary.volumes.is_empty());
    }
}
