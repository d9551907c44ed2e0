// Drives the compiled binary through a PTY so the real event loop and
// crossterm input handling are exercised end to end.
//
// Requires a TTY and is ignored by default. Run manually via:
// `cargo test --test integration_min_session -- --ignored`.

#![cfg(unix)]

use std::time::Duration;

use expectrl::{spawn, Eof};

#[test]
#[ignore]
fn minimal_session_ignores_early_answer_and_exits() -> Result<(), Box<dyn std::error::Error>> {
    let bin = assert_cmd::cargo::cargo_bin("flashword");
    let cmd = format!("{} --no-locator --max-attempts 1 --seed 1", bin.display());

    let mut p = spawn(cmd)?;

    std::thread::sleep(Duration::from_millis(500));

    // number keys outside a question are ignored
    p.send("1")?;
    std::thread::sleep(Duration::from_millis(200));

    p.send("\x1b")?; // ESC
    p.expect(Eof)?;
    Ok(())
}

#[test]
#[ignore]
fn escape_during_locator_exits() -> Result<(), Box<dyn std::error::Error>> {
    let bin = assert_cmd::cargo::cargo_bin("flashword");
    let mut p = spawn(format!("{}", bin.display()))?;

    std::thread::sleep(Duration::from_millis(200));
    p.send("\x1b")?;
    p.expect(Eof)?;
    Ok(())
}
