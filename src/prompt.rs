use anyhow::{Result, bail};
use std::io::{self, IsTerminal};
use zeroize::Zeroizing;

/// Reads the app password.
///
/// Precedence: the `PASSFORGE_PASSWORD` environment variable, then a line
/// from piped stdin, then an interactive prompt.
pub fn read_app_password() -> Result<Zeroizing<String>> {
    read_secret("PASSFORGE_PASSWORD", "App password: ")
}

/// Reads the master password.
///
/// Same precedence as the app password, with `PASSFORGE_MASTER`. When both
/// secrets arrive over piped stdin, the app password is the first line and
/// the master password the second.
pub fn read_master_password() -> Result<Zeroizing<String>> {
    read_secret("PASSFORGE_MASTER", "Master password: ")
}

fn read_secret(env_var: &str, prompt: &str) -> Result<Zeroizing<String>> {
    //  PASSFORGE_PASSWORD="..." passforge generate github
    if let Ok(pw) = std::env::var(env_var) {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    //  printf "%s\n" "$PW" | passforge services
    if !io::stdin().is_terminal() {
        let mut line = Zeroizing::new(String::new());
        io::stdin().read_line(&mut line)?;
        trim_newline(&mut line);

        if !line.is_empty() {
            return Ok(line);
        }
    }

    if io::stdin().is_terminal() {
        let pw = rpassword::prompt_password(prompt)?;
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    bail!("no password provided")
}

fn trim_newline(s: &mut String) {
    while s.ends_with('\n') || s.ends_with('\r') {
        s.pop();
    }
}
