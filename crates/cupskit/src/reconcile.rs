//! The reconciliation state machine.
//!
//! One pass takes a declaration from [`DestinationSpec`] to convergence:
//! read live state, compare, then issue the minimal `lpadmin` sequence.
//! There is no in-place edit for identity-defining attributes (URI,
//! driver), so any checkable mismatch tears the destination down and
//! rebuilds it. Write-only attributes are reasserted on every pass
//! instead of compared.
//!
//! Mutating commands run strictly one at a time and their streams fold
//! into a single transcript. A command's own failure status is recorded
//! there rather than aborting the pass; only validation errors, failed
//! read queries, and a reassert that reports to stderr are fatal.

use crate::compare;
use crate::error::{Error, Result};
use crate::runner::{CommandOutput, CommandRunner};
use crate::state::StateReader;
use crate::types::{
    DestinationKind, DestinationSpec, DriverMode, PurgeOutcome, ReconcileOutcome, TargetState,
};

/// Drives one destination declaration to its requested state.
pub struct Reconciler<'r> {
    runner: &'r dyn CommandRunner,
    spec: DestinationSpec,
}

impl<'r> Reconciler<'r> {
    /// Create a reconciler for one declaration. The declaration is
    /// normalized here; validation happens per requested state.
    pub fn new(runner: &'r dyn CommandRunner, spec: DestinationSpec) -> Self {
        Self {
            runner,
            spec: spec.normalized(),
        }
    }

    /// Converge the destination to its declared configuration,
    /// installing or rebuilding it as needed.
    pub fn ensure_present(&self) -> Result<ReconcileOutcome> {
        self.spec.validate(TargetState::Present)?;
        let mut transcript = Transcript::default();
        match self.spec.kind {
            DestinationKind::Printer => self.converge_printer(&mut transcript)?,
            DestinationKind::Class => self.converge_class(&mut transcript)?,
        }
        Ok(self.outcome(TargetState::Present, transcript))
    }

    /// Delete the destination if it exists. Deleting a destination that
    /// is already gone is a no-op, not an error.
    pub fn ensure_absent(&self) -> Result<ReconcileOutcome> {
        self.spec.validate(TargetState::Absent)?;
        let reader = self.reader();
        let mut transcript = Transcript::default();
        if reader.exists(&self.spec.name)? {
            let output = self.lpadmin(&remove_args(&self.spec.name))?;
            transcript.absorb(&output);
        }
        Ok(self.outcome(TargetState::Absent, transcript))
    }

    fn converge_printer(&self, transcript: &mut Transcript) -> Result<()> {
        let reader = self.reader();
        let name = &self.spec.name;

        if reader.exists(name)? && !compare::printer_settings_match(&reader, &self.spec)? {
            let output = self.lpadmin(&remove_args(name))?;
            transcript.absorb(&output);
        }

        if !reader.exists(name)? {
            let output = self.lpadmin(&printer_install_args(&self.spec))?;
            transcript.absorb(&output);
        }

        self.reassert_uncheckables(&reader)?;

        if !compare::vendor_options_match(&reader, &self.spec)? {
            let output = self.lpadmin(&vendor_options_args(&self.spec))?;
            transcript.absorb(&output);
        }

        Ok(())
    }

    fn converge_class(&self, transcript: &mut Transcript) -> Result<()> {
        let reader = self.reader();
        let name = &self.spec.name;

        if reader.exists(name)? && !compare::class_settings_match(&reader, &self.spec)? {
            let output = self.lpadmin(&remove_args(name))?;
            transcript.absorb(&output);
        }

        if !reader.exists(name)? {
            self.install_class(&reader, transcript)?;
        }

        self.reassert_uncheckables(&reader)?;

        Ok(())
    }

    /// Build a class by adding each declared member in order, then set
    /// the class-level attributes.
    ///
    /// Every member is probed for existence before the first add, so a
    /// misdeclared member never leaves a partial class behind. A partial
    /// class can still result if `lpadmin` itself rejects an add partway
    /// through the loop; `lpadmin -c` has no batch form, and the next
    /// pass will tear the mismatched class down and rebuild it.
    fn install_class(&self, reader: &StateReader<'_>, transcript: &mut Transcript) -> Result<()> {
        for member in &self.spec.members {
            if !reader.exists(member)? {
                return Err(Error::MissingMember {
                    member: member.clone(),
                    class_name: self.spec.name.clone(),
                });
            }
        }

        for member in &self.spec.members {
            let output = self.lpadmin(&member_add_args(member, &self.spec.name))?;
            transcript.absorb(&output);
        }

        if reader.exists(&self.spec.name)? {
            let output = self.lpadmin(&class_settings_args(&self.spec))?;
            transcript.absorb(&output);
        }

        Ok(())
    }

    /// Force-set the write-only attributes, when any are declared.
    ///
    /// These have no read path, so the command repeats on every pass.
    /// It stays out of the transcript and the changed verdict, but any
    /// error text it produces fails the whole run: silently dropping a
    /// quota or policy would go unnoticed forever.
    fn reassert_uncheckables(&self, reader: &StateReader<'_>) -> Result<()> {
        let Some(args) = reassert_args(&self.spec) else {
            return Ok(());
        };
        if !reader.exists(&self.spec.name)? {
            return Ok(());
        }
        let output = self.lpadmin(&args)?;
        let stderr = output.stderr.trim();
        if !stderr.is_empty() {
            return Err(Error::CommandFailed {
                command: format!("lpadmin {}", args.join(" ")),
                stderr: stderr.to_string(),
            });
        }
        Ok(())
    }

    fn reader(&self) -> StateReader<'r> {
        StateReader::new(self.runner)
    }

    fn lpadmin(&self, args: &[String]) -> Result<CommandOutput> {
        run_lpadmin(self.runner, args)
    }

    fn outcome(&self, state: TargetState, transcript: Transcript) -> ReconcileOutcome {
        let changed = transcript.changed();
        let (stdout, stderr) = transcript.into_streams();
        ReconcileOutcome {
            state,
            kind: self.spec.kind,
            name: self.spec.name.clone(),
            changed,
            stdout,
            stderr,
        }
    }
}

/// Delete every destination the subsystem currently reports.
///
/// Enumerates live destinations once and issues one delete per name.
/// With nothing installed this is a no-op that reports nothing removed.
pub fn purge_all(runner: &dyn CommandRunner) -> Result<PurgeOutcome> {
    let reader = StateReader::new(runner);
    let names = reader.all_destinations()?;

    let mut transcript = Transcript::default();
    let mut removed = Vec::with_capacity(names.len());
    for name in names {
        let output = run_lpadmin(runner, &remove_args(&name))?;
        transcript.absorb(&output);
        removed.push(name);
    }

    let changed = transcript.changed();
    let (stdout, stderr) = transcript.into_streams();
    Ok(PurgeOutcome {
        removed,
        changed,
        stdout,
        stderr,
    })
}

/// Accumulated streams of the mutating commands issued during one pass.
#[derive(Debug, Default)]
struct Transcript {
    stdout: String,
    stderr: String,
    commands: usize,
}

impl Transcript {
    fn absorb(&mut self, output: &CommandOutput) {
        self.commands += 1;
        fold(&mut self.stdout, &output.stdout);
        fold(&mut self.stderr, &output.stderr);
    }

    fn changed(&self) -> bool {
        self.commands > 0
    }

    fn into_streams(self) -> (Option<String>, Option<String>) {
        (non_empty(self.stdout), non_empty(self.stderr))
    }
}

/// Newline-join a command's stream onto the buffer, keeping the result
/// free of leading and trailing newlines.
fn fold(buffer: &mut String, chunk: &str) {
    let joined = format!("{buffer}\n{chunk}");
    *buffer = joined.trim_matches('\n').to_string();
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() { None } else { Some(text) }
}

fn run_lpadmin(runner: &dyn CommandRunner, args: &[String]) -> Result<CommandOutput> {
    let argv: Vec<&str> = args.iter().map(String::as_str).collect();
    runner.run("lpadmin", &argv)
}

fn remove_args(name: &str) -> Vec<String> {
    vec!["-x".to_string(), name.to_string()]
}

fn member_add_args(member: &str, class_name: &str) -> Vec<String> {
    vec![
        "-p".to_string(),
        member.to_string(),
        "-c".to_string(),
        class_name.to_string(),
    ]
}

fn printer_install_args(spec: &DestinationSpec) -> Vec<String> {
    let mut args = vec!["-p".to_string(), spec.name.clone()];
    if let Some(uri) = &spec.uri {
        args.push("-v".to_string());
        args.push(uri.clone());
    }
    if spec.enabled {
        args.push("-E".to_string());
    }
    push_option(
        &mut args,
        format!("printer-is-shared={}", compare::bool_word(spec.shared)),
    );
    if let Some(model) = &spec.model {
        let flag = match spec.driver {
            DriverMode::Model => "-m",
            DriverMode::Ppd => "-P",
        };
        args.push(flag.to_string());
        args.push(model.clone());
    }
    if let Some(info) = &spec.info {
        args.push("-D".to_string());
        args.push(info.clone());
    }
    if let Some(location) = &spec.location {
        args.push("-L".to_string());
        args.push(location.clone());
    }
    if spec.is_default {
        args.push("-d".to_string());
        args.push(spec.name.clone());
    }
    args
}

fn class_settings_args(spec: &DestinationSpec) -> Vec<String> {
    let mut args = vec!["-p".to_string(), spec.name.clone()];
    if spec.enabled {
        args.push("-E".to_string());
    }
    push_option(
        &mut args,
        format!("printer-is-shared={}", compare::bool_word(spec.shared)),
    );
    if let Some(info) = &spec.info {
        args.push("-D".to_string());
        args.push(info.clone());
    }
    if let Some(location) = &spec.location {
        args.push("-L".to_string());
        args.push(location.clone());
    }
    args
}

/// Arguments for the write-only attribute command, or `None` when the
/// declaration carries no write-only attribute. Job limits and quota
/// periods apply to printers only.
fn reassert_args(spec: &DestinationSpec) -> Option<Vec<String>> {
    let mut options = Vec::new();
    if let Some(flag) = spec.report_ipp_supply_levels {
        options.push(format!("cupsIPPSupplies={}", compare::bool_word(flag)));
    }
    if let Some(flag) = spec.report_snmp_supply_levels {
        options.push(format!("cupsSNMPSupplies={}", compare::bool_word(flag)));
    }
    if spec.kind == DestinationKind::Printer {
        if let Some(limit) = spec.job_kb_limit {
            options.push(format!("job-k-limit={limit}"));
        }
        if let Some(limit) = spec.job_page_limit {
            options.push(format!("job-page-limit={limit}"));
        }
        if let Some(period) = spec.job_quota_period {
            options.push(format!("job-quota-period={period}"));
        }
    }
    if let Some(policy) = &spec.policy {
        options.push(format!("printer-op-policy={policy}"));
    }

    if options.is_empty() {
        return None;
    }
    let mut args = vec!["-p".to_string(), spec.name.clone()];
    for option in options {
        push_option(&mut args, option);
    }
    Some(args)
}

fn vendor_options_args(spec: &DestinationSpec) -> Vec<String> {
    let mut args = vec!["-p".to_string(), spec.name.clone()];
    for (key, value) in &spec.options {
        push_option(&mut args, format!("{key}={value}"));
    }
    if spec.is_default {
        args.push("-d".to_string());
        args.push(spec.name.clone());
    }
    args
}

fn push_option(args: &mut Vec<String>, option: String) {
    args.push("-o".to_string());
    args.push(option);
}
