use std::fs;

use vm_translator::{discover, Options, TranslateError, Translator};

fn translate_all(sources: &vm_translator::Sources) -> String {
    let mut translator = Translator::new(Options {
        halt: sources.standalone,
        ..Options::default()
    });
    for file in &sources.files {
        translator.translate_file(file).unwrap();
    }
    translator.finish();
    translator.write_bin(&sources.output, "test").unwrap();
    fs::read_to_string(&sources.output).unwrap()
}

#[test]
fn single_file_mode() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("SimpleAdd.vm");
    fs::write(&path, "// adds\npush constant 7\npush constant 8\nadd\n").unwrap();

    let sources = discover(&path).unwrap();
    assert!(sources.standalone);
    assert_eq!(sources.files, vec![path.clone()]);
    assert_eq!(sources.output, dir.path().join("SimpleAdd.asm"));

    let out = translate_all(&sources);
    assert!(out.contains("// push constant 7"));
    assert!(out.contains("@Sys.init"));
    assert!(out.trim_end().ends_with("0;JMP"));
    assert!(out.contains("($HALT)"));
}

#[test]
fn directory_mode_sorts_units_and_names_output_after_dir() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let prog = dir.path().join("Prog");
    fs::create_dir(&prog).unwrap();
    fs::write(prog.join("Sys.vm"), "function Sys.init 0\npush static 0\ncall Main.main 0\nlabel END\ngoto END\n").unwrap();
    fs::write(prog.join("Main.vm"), "function Main.main 0\npush static 0\nreturn\n").unwrap();
    fs::write(prog.join("notes.txt"), "not vm code").unwrap();

    let sources = discover(&prog).unwrap();
    assert!(!sources.standalone);
    assert_eq!(sources.files, vec![prog.join("Main.vm"), prog.join("Sys.vm")]);
    assert_eq!(sources.output, prog.join("Prog.asm"));

    let out = translate_all(&sources);
    assert!(out.contains("@Main.0"));
    assert!(out.contains("@Sys.0"));
    assert!(!out.contains("($HALT)"));
    assert!(out.find("(Main.main)").unwrap() < out.find("(Sys.init)").unwrap());
}

#[test]
fn rejects_non_vm_inputs() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let txt = dir.path().join("prog.txt");
    fs::write(&txt, "add").unwrap();
    assert!(discover(&txt).is_err());
    assert!(discover(&dir.path().join("missing.vm")).is_err());

    let empty = dir.path().join("empty");
    fs::create_dir(&empty).unwrap();
    assert!(discover(&empty).is_err());
}

#[test]
fn reports_unit_and_position() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("Broken.vm");
    fs::write(&path, "push constant 1\n\npop constant 0\n").unwrap();

    let mut translator = Translator::new(Options::default());
    let err = translator.translate_file(&path).unwrap_err();
    assert_eq!(
        err.to_string(),
        "in Broken: 3:1: cannot pop into the constant segment"
    );
}

#[test]
fn unreadable_source_is_an_io_error() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let mut translator = Translator::new(Options::default());
    let err = translator
        .translate_file(&dir.path().join("Gone.vm"))
        .unwrap_err();
    assert!(matches!(err, TranslateError::Io { .. }));
}
