use std::fs;
use std::io::Write;
use std::path::Path;

use fankit_core::{Command, CommandName};
use fankit_pipeline::{Error, Pipe, Processor, SmoothingPipe, SpinupPipe};
use tempfile::TempDir;

fn write_gcode(dir: &TempDir, name: &str, lines: &[&str]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = fs::File::create(&path).unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file.flush().unwrap();
    path
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn empty_chain_copies_the_file_unchanged() {
    let dir = TempDir::new().unwrap();
    let lines = ["M204 P1500", "G1 X10 Y5 F3000", "", "; end of print"];
    let path = write_gcode(&dir, "plain.gcode", &lines);

    Processor::new().run(&path).unwrap();

    assert_eq!(read_lines(&path), lines);
}

#[test]
fn comment_only_file_survives_smoothing_untouched() {
    let dir = TempDir::new().unwrap();
    let lines = [";FLAVOR:Marlin", ";TIME:1234", "; generated by a slicer"];
    let path = write_gcode(&dir, "comments.gcode", &lines);

    let mut processor = Processor::new();
    processor.add_pipe(Box::new(SmoothingPipe::new(300.0, 3.0)));
    processor.run(&path).unwrap();

    assert_eq!(read_lines(&path), lines);
}

#[test]
fn fan_burst_is_consolidated_per_duty_plateau() {
    let dir = TempDir::new().unwrap();
    let path = write_gcode(
        &dir,
        "burst.gcode",
        &["M106 S50", "G1 X10 F3000", "M106 S255", "M107"],
    );

    let mut processor = Processor::new();
    processor.add_pipe(Box::new(SmoothingPipe::new(300.0, 3.0)));
    processor.run(&path).unwrap();

    let output = read_lines(&path);
    assert_eq!(
        output,
        vec!["M106 S50.00", "G1 X10 F3000", "M106 S255.00", "M106 S0.00"]
    );
    // No raw M107 and at most one M106 per stable duty value.
    assert!(!output.iter().any(|l| l.starts_with("M107")));
    let fan_count = output.iter().filter(|l| l.starts_with("M106")).count();
    assert_eq!(fan_count, 3);
}

#[test]
fn spinup_emits_the_increase_before_earlier_commands() {
    let dir = TempDir::new().unwrap();
    let path = write_gcode(
        &dir,
        "spinup.gcode",
        &[
            "G1 X10 E0.5 F6000",
            "G1 X20 E0.5",
            "M106 S255",
            "G1 X30 E0.5",
        ],
    );

    let mut processor = Processor::new();
    processor.add_pipe(Box::new(SpinupPipe::new(150.0)));
    processor.run(&path).unwrap();

    let output = read_lines(&path);
    let synth = output.iter().position(|l| l == "M106 S255.00").unwrap();
    let second_move = output.iter().position(|l| l == "G1 X20 E0.5").unwrap();
    assert!(synth < second_move);
    // The original fan command survives at its own position in time.
    assert!(output.contains(&"M106 S255".to_string()));
}

#[test]
fn unknown_commands_pass_through_byte_for_byte() {
    let dir = TempDir::new().unwrap();
    let lines = [
        "M204 P1500 T2000",
        "SET_PRESSURE_ADVANCE ADVANCE=0.05",
        "M900 K0.2 ; linear advance",
    ];
    let path = write_gcode(&dir, "dialect.gcode", &lines);

    let mut processor = Processor::new();
    processor.add_pipe(Box::new(SmoothingPipe::new(300.0, 3.0)));
    processor.run(&path).unwrap();

    assert_eq!(read_lines(&path), lines);
}

struct FailingWarmupPipe;

impl Pipe for FailingWarmupPipe {
    fn name(&self) -> &str {
        "failing_warmup"
    }

    fn description(&self) -> &str {
        "test pipe whose warmup always fails"
    }

    fn supported_commands(&self) -> &[CommandName] {
        &[]
    }

    fn warmup(&mut self) -> fankit_pipeline::Result<()> {
        Err(Error::Io(std::io::Error::other("refused to warm up")))
    }

    fn input(&mut self, command: Command, out: &mut Vec<Command>) -> fankit_pipeline::Result<()> {
        out.push(command);
        Ok(())
    }
}

#[test]
fn warmup_failure_cleans_up_and_keeps_the_original() {
    let dir = TempDir::new().unwrap();
    let lines = ["G1 X10 F3000", "M106 S255"];
    let path = write_gcode(&dir, "keep.gcode", &lines);

    let mut processor = Processor::new();
    processor.add_pipe(Box::new(FailingWarmupPipe));
    assert!(processor.run(&path).is_err());

    // Original untouched, sibling temp file removed.
    assert_eq!(read_lines(&path), lines);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn missing_input_leaves_no_sibling_file_behind() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.gcode");

    let result = Processor::new().run(&path);
    assert!(result.is_err());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn smoothing_and_spinup_compose() {
    let dir = TempDir::new().unwrap();
    let path = write_gcode(
        &dir,
        "both.gcode",
        &[
            "M106 S50",
            "M106 S255",
            "G1 X10 E0.5 F6000",
            "G1 X20 E0.5",
            "G1 X30 E0.5",
        ],
    );

    let mut processor = Processor::new();
    processor.add_pipe(Box::new(SmoothingPipe::new(100.0, 1000.0)));
    processor.add_pipe(Box::new(SpinupPipe::new(50.0)));
    processor.run(&path).unwrap();

    let output = read_lines(&path);
    // Smoothing collapsed the burst to the 255 plateau; every move survived.
    assert!(output.contains(&"M106 S255.00".to_string()));
    assert!(!output.contains(&"M106 S50".to_string()));
    for line in ["G1 X10 E0.5 F6000", "G1 X20 E0.5", "G1 X30 E0.5"] {
        assert!(output.contains(&line.to_string()), "missing {line}");
    }
}
