use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::policy::ResolutionPlan;

/// Answers accepted as approval, compared after trimming and lowercasing.
pub const AFFIRMATIVE_ANSWERS: [&str; 4] = ["yes", "y", "да", "д"];

/// Gate in front of the destructive phase. Returning `false` aborts the run
/// before any row is touched.
pub trait Confirmation {
    fn confirm(&mut self, plan: &ResolutionPlan, backup: &Path) -> bool;
}

impl<F> Confirmation for F
where
    F: FnMut(&ResolutionPlan, &Path) -> bool,
{
    fn confirm(&mut self, plan: &ResolutionPlan, backup: &Path) -> bool {
        self(plan, backup)
    }
}

/// Approves without asking. Used for `--yes`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

impl Confirmation for AutoApprove {
    fn confirm(&mut self, plan: &ResolutionPlan, _backup: &Path) -> bool {
        tracing::info!(to_delete = plan.records_to_delete(), "confirmation skipped, auto-approved");
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Decline;

impl Confirmation for Decline {
    fn confirm(&mut self, _plan: &ResolutionPlan, _backup: &Path) -> bool {
        false
    }
}

pub fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim().to_lowercase();
    AFFIRMATIVE_ANSWERS.contains(&answer.as_str())
}

/// Shows the plan on `output` and reads one line from `input`.
pub struct PromptConfirmation<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptConfirmation<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }

    fn ask(&mut self, plan: &ResolutionPlan, backup: &Path) -> io::Result<bool> {
        render_plan(plan, &mut self.output)?;
        writeln!(self.output)?;
        writeln!(self.output, "WARNING")?;
        writeln!(self.output, "  Duplicate groups found:  {}", plan.groups_found())?;
        writeln!(self.output, "  Records to delete:       {}", plan.records_to_delete())?;
        writeln!(self.output, "  Records to keep:         {}", plan.records_to_keep())?;
        writeln!(self.output, "  Backup saved at:         {}", backup.display())?;
        write!(self.output, "\nProceed with deletion? (yes/no): ")?;
        self.output.flush()?;

        let mut answer = String::new();
        if self.input.read_line(&mut answer)? == 0 {
            return Ok(false);
        }
        Ok(is_affirmative(&answer))
    }
}

impl PromptConfirmation<io::StdinLock<'static>, io::Stderr> {
    /// Prompt on stderr so stdout stays free for command output.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> Confirmation for PromptConfirmation<R, W> {
    fn confirm(&mut self, plan: &ResolutionPlan, backup: &Path) -> bool {
        match self.ask(plan, backup) {
            Ok(approved) => approved,
            Err(e) => {
                tracing::warn!(error = %e, "could not read confirmation, treating as decline");
                false
            }
        }
    }
}

/// Per-group listing with each member's score and KEEP/DELETE verdict.
pub fn render_plan(plan: &ResolutionPlan, out: &mut impl Write) -> io::Result<()> {
    for (i, resolution) in plan.resolutions.iter().enumerate() {
        let key = &resolution.key;
        writeln!(out, "\n{}. [{}] '{}'", i + 1, key.kind, key.title)?;
        if !key.creator.is_empty() {
            writeln!(out, "   Creator: {}", key.creator)?;
        }
        writeln!(out, "   Copies: {}", resolution.group_size())?;

        let members = std::iter::once((&resolution.keeper, "KEEP"))
            .chain(resolution.losers.iter().map(|l| (l, "DELETE")));
        for (j, (member, verdict)) in members.enumerate() {
            let record = &member.record;
            writeln!(
                out,
                "   {}. id {} - score {} - {verdict}",
                j + 1,
                record.id,
                member.score
            )?;
            writeln!(
                out,
                "      year: {} | rating: {} | image: {} | ai: {}",
                record.year.map(|y| y.to_string()).unwrap_or_else(|| "n/a".to_string()),
                record.rating.map(|r| r.to_string()).unwrap_or_else(|| "n/a".to_string()),
                if record.image_url.is_some() { "yes" } else { "no" },
                if record.needs_ai { "needed" } else { "done" },
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::DuplicateGroup;
    use crate::policy::ResolutionPolicy;
    use moodshelf_core::{ContentRecord, ContentType};
    use std::io::Cursor;

    fn plan() -> ResolutionPlan {
        let records = vec![
            ContentRecord::new(1, ContentType::Movie, "Alien").with_creator("Ridley Scott"),
            ContentRecord::new(2, ContentType::Movie, "alien").with_creator("ridley scott"),
        ];
        ResolutionPolicy::default().plan(vec![DuplicateGroup {
            key: records[0].identity_key(),
            records,
        }])
    }

    fn answer(input: &str) -> (bool, String) {
        let mut gate = PromptConfirmation::new(Cursor::new(input.as_bytes().to_vec()), Vec::new());
        let approved = gate.confirm(&plan(), Path::new("/backups/content_backup.db"));
        let (_, output) = gate.into_inner();
        (approved, String::from_utf8(output).unwrap())
    }

    #[test]
    fn affirmative_answers() {
        for yes in ["yes", "Y", " y\n", "ДА", "д"] {
            assert!(is_affirmative(yes), "{yes:?}");
        }
        for no in ["", "no", "n", "yes please", "нет", "  "] {
            assert!(!is_affirmative(no), "{no:?}");
        }
    }

    #[test]
    fn prompt_approves_on_yes() {
        let (approved, output) = answer("yes\n");
        assert!(approved);
        assert!(output.contains("Records to delete:       1"));
        assert!(output.contains("/backups/content_backup.db"));
        assert!(output.contains("id 1 - score 0 - KEEP"));
        assert!(output.contains("id 2 - score 0 - DELETE"));
    }

    #[test]
    fn prompt_declines_on_empty_line_and_eof() {
        assert!(!answer("\n").0);
        assert!(!answer("").0);
        assert!(!answer("maybe\n").0);
    }

    #[test]
    fn closures_are_confirmations() {
        let mut seen = 0;
        let mut gate = |plan: &ResolutionPlan, _: &Path| {
            seen = plan.records_to_delete();
            true
        };
        assert!(gate.confirm(&plan(), Path::new("b.db")));
        assert_eq!(seen, 1);
    }

    #[test]
    fn fixed_strategies() {
        assert!(AutoApprove.confirm(&plan(), Path::new("b.db")));
        assert!(!Decline.confirm(&plan(), Path::new("b.db")));
    }
}
