use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use colored::Colorize;

use crate::record::Credential;
use crate::verify::Outcome;

/// Turns structured outcomes into terminal lines and the optional
/// append-only success file. The runner never hands this formatted text,
/// only outcomes.
pub struct Reporter {
    only_successes: bool,
    success_file: Option<BufWriter<File>>,
}

impl Reporter {
    /// The output file is opened in append mode, so re-runs keep the
    /// successes of earlier runs.
    pub fn new(only_successes: bool, output: Option<&Path>) -> io::Result<Self> {
        let success_file = match output {
            Some(path) => Some(BufWriter::new(
                OpenOptions::new().create(true).append(true).open(path)?,
            )),
            None => None,
        };
        Ok(Self {
            only_successes,
            success_file,
        })
    }

    /// One line per record. `Success` pairs are also persisted verbatim as
    /// `email:password`.
    pub fn record(&mut self, raw_line: &str, cred: Option<&Credential>, outcome: &Outcome) {
        if let Outcome::Success = outcome {
            if let Some(cred) = cred {
                self.login_line(cred, "SUCCEEDED".green(), None);
                if let Some(f) = &mut self.success_file {
                    writeln!(f, "{}", cred.combo()).ok();
                }
            }
            return;
        }
        if self.only_successes {
            return;
        }
        match (outcome, cred) {
            (Outcome::AuthFailure, Some(cred)) => {
                self.login_line(cred, "FAILED".red(), None);
            }
            (Outcome::ConnectionError(detail), Some(cred)) => {
                self.login_line(cred, "ERROR".red(), Some(detail.as_str()));
            }
            (Outcome::UnknownDomain, Some(cred)) => {
                println!(
                    "\u{26a0} Missing config section for domain: {}",
                    cred.domain().yellow()
                );
            }
            (Outcome::InvalidDomainConfig(detail), Some(cred)) => {
                println!(
                    "\u{26a0} Bad config for domain {}: {}",
                    cred.domain().yellow(),
                    detail
                );
            }
            (Outcome::InvalidIdentifier, Some(cred)) => {
                println!("\u{274c} Invalid e-mail: {}", cred.email.as_str().yellow());
            }
            (Outcome::MalformedRecord, _) => {
                println!("\u{274c} Malformed line: {}", raw_line.trim_end().yellow());
            }
            // A record outcome without its credential cannot happen past
            // parsing; stay quiet rather than panic in the sink.
            _ => {}
        }
    }

    fn login_line(&self, cred: &Credential, verdict: colored::ColoredString, detail: Option<&str>) {
        let mut line = format!(
            "E-Mail: {} | Password: {} | Login: {}",
            cred.email.as_str().yellow(),
            cred.password.as_str().yellow(),
            verdict
        );
        if let Some(detail) = detail {
            line.push_str(&format!(" ({detail})"));
        }
        println!("{line}");
    }

    /// Trailing summary, printed after the last record and on interrupt.
    pub fn summary(&self, succeeded: u64, total: u64) {
        println!("Logins succeeded: {succeeded}/{total}");
    }

    pub fn flush(&mut self) {
        if let Some(f) = &mut self.success_file {
            f.flush().ok();
        }
    }
}
