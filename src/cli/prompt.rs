//! Line-oriented terminal prompts for schema resolution.

use std::io::{self, BufRead, Write};

use crate::core::loaders::RawTable;
use crate::core::schema::{ColumnMapping, Field};
use crate::processors::resolver::{PromptError, PromptResult, Prompter};

/// Answer that declines a choice or a save.
pub const REFUSAL: &str = "NO";

/// Rows of the table shown before column questions.
const PREVIEW_ROWS: usize = 5;

/// [`Prompter`] reading answers line by line, re-asking on invalid input.
pub struct TerminalPrompter<R: BufRead, W: Write> {
    input: R,
    output: W,
    preview_shown: bool,
}

impl TerminalPrompter<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            preview_shown: false,
        }
    }

    /// Consume the prompter, returning the output sink.
    pub fn into_output(self) -> W {
        self.output
    }

    fn ask(&mut self, question: &str) -> PromptResult<String> {
        writeln!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(PromptError::Closed);
        }
        Ok(line.trim().to_string())
    }
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn choose_from_list(&mut self, names: &[String]) -> PromptResult<Option<String>> {
        writeln!(self.output, "Known headers:")?;
        for name in names {
            writeln!(self.output, "  {}", name)?;
        }

        loop {
            let answer = self.ask("Choose an existing header or type NO:")?;
            if answer == REFUSAL {
                return Ok(None);
            }
            if names.iter().any(|n| *n == answer) {
                return Ok(Some(answer));
            }
            writeln!(self.output, "'{}' is not a known header.", answer)?;
        }
    }

    fn column_for(&mut self, field: Field, table: &RawTable) -> PromptResult<usize> {
        if !self.preview_shown {
            writeln!(self.output, "{}", table.preview(PREVIEW_ROWS))?;
            self.preview_shown = true;
        }

        let question = format!("Which column number contains the {}?", field.label());
        loop {
            let answer = self.ask(&question)?;
            match answer.parse::<usize>() {
                Ok(column) if column < table.width() => return Ok(column),
                _ => writeln!(
                    self.output,
                    "Enter a column number between 0 and {}.",
                    table.width().saturating_sub(1)
                )?,
            }
        }
    }

    fn confirm_save(&mut self, _mapping: &ColumnMapping) -> PromptResult<Option<String>> {
        loop {
            let answer = self.ask(
                "What would you like to save this header as? If you do not want to save, type NO.",
            )?;
            match answer.as_str() {
                REFUSAL => return Ok(None),
                "" => continue,
                _ => return Ok(Some(answer)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::tests::fixture_mapping;
    use std::io::Cursor;

    fn prompter(input: &str) -> TerminalPrompter<Cursor<Vec<u8>>, Vec<u8>> {
        TerminalPrompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn output(p: TerminalPrompter<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8(p.into_output()).unwrap()
    }

    fn names() -> Vec<String> {
        vec!["rig-a".to_string(), "rig-b".to_string()]
    }

    #[test]
    fn test_choose_reprompts_until_known() {
        let mut p = prompter("rig-z\n rig-b \n");
        assert_eq!(p.choose_from_list(&names()).unwrap(), Some("rig-b".to_string()));

        let out = output(p);
        assert!(out.starts_with("Known headers:\n  rig-a\n  rig-b\n"));
        assert_eq!(out.matches("Choose an existing header or type NO:").count(), 2);
    }

    #[test]
    fn test_choose_refusal() {
        let mut p = prompter("NO\n");
        assert_eq!(p.choose_from_list(&names()).unwrap(), None);
    }

    #[test]
    fn test_column_prompt_validates_range() {
        let table = RawTable::from_rows(vec![vec!["a".to_string(); 4]]);
        let mut p = prompter("seven\n9\n2\n3\n");

        assert_eq!(p.column_for(Field::Date, &table).unwrap(), 2);
        assert_eq!(p.column_for(Field::Time, &table).unwrap(), 3);

        let out = output(p);
        assert_eq!(out.matches("Which column number contains the date?").count(), 3);
        assert_eq!(out.matches("between 0 and 3").count(), 2);
        // preview printed once
        assert_eq!(out.matches("0\t1\t2\t3").count(), 1);
    }

    #[test]
    fn test_confirm_save() {
        let mut p = prompter("\nrig-c\n");
        assert_eq!(p.confirm_save(&fixture_mapping()).unwrap(), Some("rig-c".to_string()));

        let mut p = prompter("NO\n");
        assert_eq!(p.confirm_save(&fixture_mapping()).unwrap(), None);
    }

    #[test]
    fn test_end_of_input_is_closed() {
        let mut p = prompter("");
        assert!(matches!(p.choose_from_list(&names()), Err(PromptError::Closed)));
    }
}
