//! Run the binary against a stand-in ffmpeg script.
#![cfg(unix)]

use assert_cmd::Command;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

const FAKE_FFMPEG: &str = r#"#!/bin/sh
printf '%s\n' "$@" > "$FFPRO_ARGS_OUT"
echo "Input #0, matroska,webm, from 'in.mkv':" >&2
echo "  Duration: 00:00:01.00, start: 0.000000, bitrate: 900 kb/s" >&2
echo "  Stream #0:0: Video: h264, yuv420p, 320x240, 25 fps, 25 tbr" >&2
printf 'frame=   12 fps= 24 q=28.0 size=1kB time=00:00:00.48 speed=0.96x\r' >&2
printf 'frame=   25 fps= 25 q=-1.0 Lsize=2kB time=00:00:01.00 speed=1.0x\n' >&2
exit "${FAKE_EXIT:-0}"
"#;

const OVERWRITE_PROMPT: &str = "File 'out.mp4' already exists. Overwrite? [y/N] ";

// Asks the overwrite question, then records the answer it reads.
const ASKING_FFMPEG: &str = r#"#!/bin/sh
printf "File 'out.mp4' already exists. Overwrite? [y/N] " >&2
read answer
printf '%s' "$answer" > "$FFPRO_ANSWER_OUT"
"#;

// Copies its stdin to a file, like `ffmpeg -i - ...` consuming piped media.
const STDIN_FFMPEG: &str = r#"#!/bin/sh
cat > "$FFPRO_MEDIA_OUT"
echo "frame=    1 fps=0.0 q=0.0 size=0kB time=00:00:00.04 speed=1x" >&2
"#;

fn fake_ffmpeg(dir: &Path) -> PathBuf {
    script(dir, "ffmpeg", FAKE_FFMPEG)
}

fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

fn ffpro(tmp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ffpro").unwrap();
    // Keep user config files out of the picture.
    cmd.current_dir(tmp.path())
        .env("HOME", tmp.path())
        .env("XDG_CONFIG_HOME", tmp.path())
        .env_remove("FFPRO_FFMPEG")
        .env("FFPRO_ARGS_OUT", tmp.path().join("args.txt"));
    cmd
}

#[test]
fn arguments_reach_ffmpeg_unchanged() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    let ffmpeg = fake_ffmpeg(tmp.path());

    ffpro(&tmp)
        .arg("--ffmpeg")
        .arg(&ffmpeg)
        .args(["-hide_banner", "-y", "-i", "in.mkv", "-vf", "fps=25", "-c:v", "libx265", "out.mkv"])
        .assert()
        .success()
        .stdout(predicates::str::is_empty());

    let seen = fs::read_to_string(tmp.path().join("args.txt"))?;
    assert_eq!(
        seen.lines().collect::<Vec<_>>(),
        ["-hide_banner", "-y", "-i", "in.mkv", "-vf", "fps=25", "-c:v", "libx265", "out.mkv"]
    );
    Ok(())
}

#[test]
fn exit_code_is_forwarded() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    let ffmpeg = fake_ffmpeg(tmp.path());

    ffpro(&tmp)
        .env("FFPRO_FFMPEG", &ffmpeg)
        .env("FAKE_EXIT", "3")
        .args(["--echo-prompts", "-i", "missing.mkv", "out.mp4"])
        .assert()
        .code(3);
    Ok(())
}

#[test]
fn ffmpeg_from_config_file() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    let ffmpeg = fake_ffmpeg(tmp.path());
    fs::write(
        tmp.path().join("ffpro.json"),
        format!(r#"{{"ffmpeg": "{}", "color": false}}"#, ffmpeg.display()),
    )?;

    ffpro(&tmp).args(["-i", "in.mkv", "out.mp4"]).assert().success();
    assert!(tmp.path().join("args.txt").exists());
    Ok(())
}

#[test]
fn missing_ffmpeg_is_an_error() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;

    ffpro(&tmp)
        .args(["--ffmpeg", "/nonexistent/ffmpeg", "-i", "in.mkv", "out.mp4"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("running /nonexistent/ffmpeg"));
    Ok(())
}

#[test]
fn echoed_prompt_lands_on_stdout() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    let ffmpeg = script(tmp.path(), "ffmpeg", ASKING_FFMPEG);

    ffpro(&tmp)
        .env("FFPRO_ANSWER_OUT", tmp.path().join("answer.txt"))
        .arg("--ffmpeg")
        .arg(&ffmpeg)
        .args(["--echo-prompts", "-i", "in.mkv", "out.mp4"])
        .timeout(Duration::from_secs(10))
        .assert()
        .success()
        .stdout(predicates::str::diff(OVERWRITE_PROMPT));
    Ok(())
}

#[test]
fn unanswerable_confirmation_says_no() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    let ffmpeg = script(tmp.path(), "ffmpeg", ASKING_FFMPEG);
    fs::write(
        tmp.path().join("ffpro.json"),
        format!(r#"{{"ffmpeg": "{}", "confirm_overwrite": true}}"#, ffmpeg.display()),
    )?;

    // No terminal is attached, so the question can't be asked.
    ffpro(&tmp)
        .env("FFPRO_ANSWER_OUT", tmp.path().join("answer.txt"))
        .args(["-i", "in.mkv", "out.mp4"])
        .timeout(Duration::from_secs(10))
        .assert()
        .success()
        .stdout(predicates::str::is_empty());

    assert_eq!(fs::read_to_string(tmp.path().join("answer.txt"))?, "n");
    Ok(())
}

#[test]
fn piped_media_reaches_ffmpeg() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    let ffmpeg = script(tmp.path(), "ffmpeg", STDIN_FFMPEG);
    let media = tmp.path().join("media.bin");

    ffpro(&tmp)
        .env("FFPRO_MEDIA_OUT", &media)
        .arg("--ffmpeg")
        .arg(&ffmpeg)
        .args(["-i", "-", "out.mp4"])
        .write_stdin("MEDIA-BYTES")
        .timeout(Duration::from_secs(10))
        .assert()
        .success();

    assert_eq!(fs::read_to_string(&media)?, "MEDIA-BYTES");
    Ok(())
}

#[test]
fn stdin_input_overrides_confirmation_setting() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    let ffmpeg = script(tmp.path(), "ffmpeg", STDIN_FFMPEG);
    let media = tmp.path().join("media.bin");
    fs::write(
        tmp.path().join("ffpro.json"),
        format!(r#"{{"ffmpeg": "{}", "confirm_overwrite": true}}"#, ffmpeg.display()),
    )?;

    ffpro(&tmp)
        .env("FFPRO_MEDIA_OUT", &media)
        .args(["-f", "rawvideo", "-i", "pipe:0", "out.mp4"])
        .write_stdin("MEDIA-BYTES")
        .timeout(Duration::from_secs(10))
        .assert()
        .success();

    assert_eq!(fs::read_to_string(&media)?, "MEDIA-BYTES");
    Ok(())
}
