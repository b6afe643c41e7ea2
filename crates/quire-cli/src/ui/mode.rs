//! Output mode routing logic.

/// Output mode determines how results are formatted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Machine-readable JSON output only
    Json,
    /// Plain text, stable for logs and scripts
    #[default]
    Plain,
    /// Human-friendly with colors and tables (TTY only)
    Pretty,
}

impl OutputMode {
    /// Resolve output mode from flags and environment.
    ///
    /// `--json` wins, then an explicit `--format`, then `TERM=dumb`, and
    /// finally pretty output only when stdout is a TTY.
    pub fn resolve(
        json_flag: bool,
        format_flag: Option<&str>,
        is_tty: bool,
        term_is_dumb: bool,
    ) -> anyhow::Result<Self> {
        if json_flag {
            if format_flag.is_some() {
                return Err(anyhow::anyhow!("--format cannot be used with --json"));
            }
            return Ok(Self::Json);
        }

        match format_flag {
            Some("plain") => return Ok(Self::Plain),
            Some("pretty") => return Ok(Self::Pretty),
            Some(other) => {
                return Err(anyhow::anyhow!(
                    "Unsupported format: {} (use pretty or plain)",
                    other
                ))
            }
            None => {}
        }

        if term_is_dumb || !is_tty {
            Ok(Self::Plain)
        } else {
            Ok(Self::Pretty)
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json)
    }

    pub fn is_pretty(&self) -> bool {
        matches!(self, Self::Pretty)
    }
}
