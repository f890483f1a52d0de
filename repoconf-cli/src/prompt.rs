use anyhow::Context;
use repoconf_core::ports::Confirm;
use repoconf_core::{CancelToken, Change};
use repoconf_render::render_changes_text;
use std::io::{self, BufRead, Write};

/// Prints the change list and asks on the terminal before applying.
///
/// The question is abandoned when `cancel` fires.
#[derive(Debug, Clone, Default)]
pub struct TerminalConfirm {
    /// Answer yes without asking.
    pub assume_yes: bool,
    pub cancel: CancelToken,
}

impl Confirm for TerminalConfirm {
    fn confirm(&self, changes: &[Change]) -> anyhow::Result<bool> {
        let changes = changes.to_vec();
        let assume_yes = self.assume_yes;
        let answer = self.cancel.run_blocking(move || {
            let stdin = io::stdin();
            let mut stdout = io::stdout();
            ask(&mut stdin.lock(), &mut stdout, &changes, assume_yes)
        })?;
        answer.context("read answer")
    }
}

pub fn ask(
    input: &mut impl BufRead,
    output: &mut impl Write,
    changes: &[Change],
    assume_yes: bool,
) -> io::Result<bool> {
    output.write_all(render_changes_text(changes).as_bytes())?;
    if assume_yes {
        return Ok(true);
    }

    writeln!(output)?;
    loop {
        write!(output, "Do you want to apply these changes? [y/n]: ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(false);
        }
        match line.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repoconf_types::change::MetricChange;
    use repoconf_types::config::MetricAggregation;
    use std::io::Cursor;

    fn changes() -> Vec<Change> {
        vec![Change::Metric(MetricChange::Add {
            kind: "views".to_string(),
            aggregation: MetricAggregation::Increment,
        })]
    }

    fn answer(input: &str) -> (bool, String) {
        let mut out = Vec::new();
        let yes = ask(&mut Cursor::new(input), &mut out, &changes(), false).expect("ask");
        (yes, String::from_utf8(out).expect("utf8"))
    }

    #[test]
    fn accepts_y_and_yes() {
        assert!(answer("y\n").0);
        assert!(answer("YES\n").0);
        assert!(answer("  yes  \n").0);
    }

    #[test]
    fn no_and_end_of_input_decline() {
        assert!(!answer("n\n").0);
        assert!(!answer("No\n").0);
        assert!(!answer("").0);
        assert!(!answer("yep\n").0);
    }

    #[test]
    fn unrecognized_answers_ask_again() {
        let (yes, out) = answer("maybe\n\ny\n");
        assert!(yes);
        assert_eq!(out.matches("[y/n]").count(), 3);
    }

    #[test]
    fn lists_changes_before_asking() {
        let (_, out) = answer("n\n");
        let list = out.find("+ ").expect("change line");
        let question = out.find("[y/n]").expect("question");
        assert!(list < question);
    }

    #[test]
    fn cancelled_confirmation_is_an_error() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let confirm = TerminalConfirm {
            assume_yes: true,
            cancel,
        };
        let err = confirm.confirm(&changes()).unwrap_err();
        assert!(err.to_string().contains("cancelled"), "{err:#}");
    }

    #[test]
    fn assume_yes_prints_without_asking() {
        let mut out = Vec::new();
        let yes = ask(&mut Cursor::new(""), &mut out, &changes(), true).expect("ask");
        assert!(yes);
        assert!(!String::from_utf8(out).expect("utf8").contains("[y/n]"));
    }
}
