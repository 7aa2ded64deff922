//! Line-oriented terminal input and output

use anyhow::Result;
use std::io::{BufRead, Write};

/// Prompts and tables over any reader/writer pair
pub struct Console<R, W> {
    input: R,
    output: W,
    closed: bool,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            closed: false,
        }
    }

    /// Whether input has run out
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.output
    }

    pub fn say(&mut self, text: impl AsRef<str>) -> Result<()> {
        writeln!(self.output, "{}", text.as_ref())?;
        Ok(())
    }

    /// Read one trimmed line; `None` once input is exhausted
    pub fn line(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut buf = String::new();
        if self.input.read_line(&mut buf)? == 0 {
            self.closed = true;
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(buf.trim().to_string()))
    }

    pub fn ask(&mut self, prompt: &str) -> Result<String> {
        Ok(self.line(prompt)?.unwrap_or_default())
    }

    /// Blank answers become `None`
    pub fn ask_optional(&mut self, prompt: &str) -> Result<Option<String>> {
        Ok(self.line(prompt)?.filter(|s| !s.is_empty()))
    }

    pub fn confirm(&mut self, prompt: &str) -> Result<bool> {
        let answer = self.ask(prompt)?.to_lowercase();
        Ok(matches!(answer.as_str(), "y" | "yes"))
    }

    /// Numbered menu; returns the zero-based choice, `None` when input ends
    pub fn choose(&mut self, title: &str, options: &[&str]) -> Result<Option<usize>> {
        loop {
            self.say(format!("\n{}", title))?;
            for (i, option) in options.iter().enumerate() {
                self.say(format!("{}. {}", i + 1, option))?;
            }

            let Some(answer) = self.line(&format!("Enter choice (1-{}): ", options.len()))? else {
                return Ok(None);
            };
            match answer.parse::<usize>() {
                Ok(n) if (1..=options.len()).contains(&n) => return Ok(Some(n - 1)),
                _ => self.say(format!(
                    "Invalid choice. Please enter a number from 1 to {}.",
                    options.len()
                ))?,
            }
        }
    }

    /// Pick one of `labels` by number; blank input picks nothing
    pub fn pick(&mut self, prompt: &str, labels: &[String]) -> Result<Option<usize>> {
        for (i, label) in labels.iter().enumerate() {
            self.say(format!("  {}. {}", i + 1, label))?;
        }
        let answer = self.ask(prompt)?;
        if answer.is_empty() {
            return Ok(None);
        }
        match answer.parse::<usize>() {
            Ok(n) if (1..=labels.len()).contains(&n) => Ok(Some(n - 1)),
            _ => {
                self.say("No such entry.")?;
                Ok(None)
            }
        }
    }

    /// Render rows under aligned headers
    pub fn table(&mut self, headers: &[&str], rows: &[Vec<String>]) -> Result<()> {
        let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
        for row in rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let render = |cells: Vec<&str>| -> String {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let header_line = render(headers.to_vec());
        let rule = widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  ");
        let body: Vec<String> = rows
            .iter()
            .map(|row| render(row.iter().map(String::as_str).collect()))
            .collect();

        self.say(header_line)?;
        self.say(rule)?;
        for line in body {
            self.say(line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    pub(crate) type Scripted = Console<Cursor<Vec<u8>>, Vec<u8>>;

    /// A console fed with the given lines
    pub(crate) fn scripted(lines: &[&str]) -> Scripted {
        let mut input = lines.join("\n");
        input.push('\n');
        Console::new(Cursor::new(input.into_bytes()), Vec::new())
    }

    pub(crate) fn transcript(console: Scripted) -> String {
        String::from_utf8(console.into_output()).unwrap()
    }

    #[test]
    fn test_line_and_eof() {
        let mut console = scripted(&["  hello  "]);
        assert_eq!(console.line("> ").unwrap().as_deref(), Some("hello"));
        assert_eq!(console.line("> ").unwrap(), None);
        assert!(console.is_closed());
        assert_eq!(console.ask("> ").unwrap(), "");
    }

    #[test]
    fn test_choose_rejects_out_of_range() {
        let mut console = scripted(&["9", "x", "2"]);
        let choice = console.choose("Menu", &["One", "Two"]).unwrap();
        assert_eq!(choice, Some(1));

        let out = transcript(console);
        assert_eq!(
            out.matches("Invalid choice. Please enter a number from 1 to 2.").count(),
            2
        );
    }

    #[test]
    fn test_confirm_and_optional() {
        let mut console = scripted(&["Y", "n", ""]);
        assert!(console.confirm("sure? ").unwrap());
        assert!(!console.confirm("sure? ").unwrap());
        assert_eq!(console.ask_optional("opt: ").unwrap(), None);
    }

    #[test]
    fn test_pick() {
        let labels = vec!["Happy".to_string(), "Calm".to_string()];
        let mut console = scripted(&["2", "", "7"]);
        assert_eq!(console.pick("mood: ", &labels).unwrap(), Some(1));
        assert_eq!(console.pick("mood: ", &labels).unwrap(), None);
        assert_eq!(console.pick("mood: ", &labels).unwrap(), None);
    }

    #[test]
    fn test_table_alignment() {
        let mut console = scripted(&[]);
        console
            .table(
                &["ID", "Name"],
                &[vec!["1".into(), "Party Mix".into()], vec!["22".into(), "Calm".into()]],
            )
            .unwrap();

        let out = transcript(console);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "ID  Name");
        assert_eq!(lines[1], "--  ---------");
        assert_eq!(lines[2], "1   Party Mix");
        assert_eq!(lines[3], "22  Calm");
    }
}
