//! Yes/no prompts.

use anyhow::Result;
use std::io::{self, BufRead, Write};

/// Asks a `[y/N]` question on any reader/writer pair. Only `y` and `yes`
/// (any case, surrounding whitespace ignored) count as agreement; end of
/// input counts as no.
pub fn confirm_with_io<R: BufRead, W: Write>(
    prompt: &str,
    input: &mut R,
    output: &mut W,
) -> Result<bool> {
    write!(output, "{} [y/N] ", prompt)?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;

    let answer = line.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

/// Asks on the terminal.
pub fn confirm(prompt: &str) -> Result<bool> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();
    confirm_with_io(prompt, &mut input, &mut output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn answer(text: &str) -> Result<(bool, String)> {
        let mut input = Cursor::new(text.as_bytes().to_vec());
        let mut output = Vec::new();
        let agreed = confirm_with_io("Delete 2 version(s)?", &mut input, &mut output)?;
        Ok((agreed, String::from_utf8(output)?))
    }

    #[test]
    fn test_accepts_yes_forms() -> Result<()> {
        for text in ["y\n", "YES\n", "  Yes  \n", "y"] {
            let (agreed, _) = answer(text)?;
            assert!(agreed, "{:?} should confirm", text);
        }
        Ok(())
    }

    #[test]
    fn test_rejects_everything_else() -> Result<()> {
        for text in ["n\n", "\n", "", "yep\n", "sure\n"] {
            let (agreed, _) = answer(text)?;
            assert!(!agreed, "{:?} should not confirm", text);
        }
        Ok(())
    }

    #[test]
    fn test_prompt_text() -> Result<()> {
        let (_, prompt) = answer("n\n")?;
        assert_eq!(prompt, "Delete 2 version(s)? [y/N] ");
        Ok(())
    }
}
