//! Passphrase prompts and note body input.

use std::io::{self, IsTerminal, Read};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use dialoguer::{Confirm, Password};
use secrecy::SecretString;

/// Non-blank value of an environment variable, as a secret.
pub fn secret_from_env(name: &str) -> Option<SecretString> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(SecretString::from)
}

pub fn prompt_passphrase(prompt: &str, interactive: bool) -> anyhow::Result<SecretString> {
    if !interactive {
        return Err(anyhow::anyhow!(
            "No passphrase available. Set QUIRE_PASSPHRASE or run from a terminal."
        ));
    }
    Password::new()
        .with_prompt(prompt)
        .interact()
        .map(SecretString::from)
        .map_err(|e| anyhow::anyhow!("Failed to read passphrase: {}", e))
}

pub fn prompt_new_passphrase(prompt: &str, interactive: bool) -> anyhow::Result<SecretString> {
    if !interactive {
        return Err(anyhow::anyhow!(
            "No passphrase available. Set QUIRE_PASSPHRASE or run from a terminal."
        ));
    }
    Password::new()
        .with_prompt(prompt)
        .with_confirmation("Confirm passphrase", "Passphrases do not match")
        .interact()
        .map(SecretString::from)
        .map_err(|e| anyhow::anyhow!("Failed to read passphrase: {}", e))
}

/// Ask a yes/no question. Non-interactive sessions get `default`.
pub fn confirm(prompt: &str, default: bool) -> anyhow::Result<bool> {
    if !io::stdin().is_terminal() {
        return Ok(default);
    }
    Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact()
        .map_err(|e| anyhow::anyhow!("Failed to read answer: {}", e))
}

/// Note body from `--body`, piped stdin, or `$EDITOR`, in that order.
pub fn read_note_body(
    no_input: bool,
    body: Option<String>,
    editor_override: Option<&str>,
    initial: Option<&str>,
) -> anyhow::Result<String> {
    if let Some(value) = body {
        return Ok(value);
    }

    if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| anyhow::anyhow!("Failed to read stdin: {}", e))?;
        return Ok(buffer.trim_end().to_string());
    }

    if no_input {
        return Err(anyhow::anyhow!("--no-input requires --body or content on stdin"));
    }

    read_body_from_editor(editor_override, initial.unwrap_or(""))
}

fn read_body_from_editor(editor_override: Option<&str>, initial: &str) -> anyhow::Result<String> {
    let editor = match editor_override {
        Some(editor) => editor.to_string(),
        None => std::env::var("EDITOR").map_err(|_| {
            anyhow::anyhow!("$EDITOR is not set; use --body or pipe content via stdin")
        })?,
    };

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| anyhow::anyhow!("System time error: {}", e))?
        .as_nanos();
    let filename = format!("quire_note_{}_{}.md", std::process::id(), nanos);
    let path = std::env::temp_dir().join(filename);

    quire_core::fs::write_atomic(&path, initial.as_bytes())
        .map_err(|e| anyhow::anyhow!("Failed to create temp file: {}", e))?;

    let status = Command::new(editor)
        .arg(&path)
        .status()
        .map_err(|e| anyhow::anyhow!("Failed to launch editor: {}", e));
    let contents = match status {
        Ok(status) if status.success() => std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Failed to read temp file: {}", e)),
        Ok(_) => Err(anyhow::anyhow!("Editor exited with failure")),
        Err(e) => Err(e),
    };
    let _ = std::fs::remove_file(&path);

    Ok(contents?.trim_end().to_string())
}
