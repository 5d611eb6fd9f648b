//! An in-memory CUPS stand-in for tests.
//!
//! [`FakeCups`] keeps a destination table behind a mutex, renders real
//! `lpstat`/`lpoptions`/`lpinfo` output from it, and applies `lpadmin`
//! mutations back onto it. Reconciliation tests therefore exercise
//! genuine convergence against the same text formats the parsers see in
//! production, instead of canned strings. Every invocation is logged so
//! tests can assert exact command sequences.

use crate::error::Result;
use crate::runner::{CommandOutput, CommandRunner};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Clones share one underlying table, so a test can hand a clone to a
/// client while keeping a handle for assertions.
#[derive(Clone)]
pub(crate) struct FakeCups {
    state: Arc<Mutex<FakeState>>,
}

impl FakeCups {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState::default())),
        }
    }

    /// Add a driverless queue, the shape `lpadmin` produces for a bare
    /// `-p NAME -v URI` install.
    pub(crate) fn add_raw_printer(&self, name: &str) {
        self.add_printer(name, "lpd://remote-host/");
    }

    pub(crate) fn add_printer(&self, name: &str, uri: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .destinations
            .insert(name.to_string(), Destination::printer(name, uri));
    }

    pub(crate) fn add_class(&self, name: &str, members: &[&str]) {
        let mut state = self.state.lock().unwrap();
        let mut class = Destination::class(name);
        class.members = members.iter().map(|m| (*m).to_string()).collect();
        state.destinations.insert(name.to_string(), class);
    }

    pub(crate) fn add_driver(&self, name: &str, make_and_model: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .drivers
            .insert(name.to_string(), make_and_model.to_string());
    }

    pub(crate) fn set_cups_option(&self, name: &str, key: &str, value: Option<&str>) {
        let mut state = self.state.lock().unwrap();
        state
            .destination_mut(name)
            .cups_options
            .insert(key.to_string(), value.map(str::to_string));
    }

    pub(crate) fn remove_cups_option(&self, name: &str, key: &str) {
        let mut state = self.state.lock().unwrap();
        state.destination_mut(name).cups_options.remove(key);
    }

    pub(crate) fn set_vendor_option(
        &self,
        name: &str,
        key: &str,
        label: &str,
        values: &[&str],
        current: Option<&str>,
    ) {
        let mut state = self.state.lock().unwrap();
        state.destination_mut(name).vendor_options.insert(
            key.to_string(),
            VendorEntry {
                label: label.to_string(),
                values: values.iter().map(|v| (*v).to_string()).collect(),
                current: current.map(str::to_string),
            },
        );
    }

    /// Make every subsequent option-write command against `name` report
    /// the given text on stderr without applying anything.
    pub(crate) fn poison_option_writes(&self, name: &str, stderr: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .poisoned_option_writes
            .insert(name.to_string(), stderr.to_string());
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.state.lock().unwrap().destinations.contains_key(name)
    }

    pub(crate) fn default_destination(&self) -> Option<String> {
        self.state.lock().unwrap().default_destination.clone()
    }

    /// Every command issued so far, space-joined, in order.
    pub(crate) fn commands(&self) -> Vec<String> {
        self.state.lock().unwrap().log.clone()
    }

    /// The `lpadmin` invocations issued so far, in order.
    pub(crate) fn mutations(&self) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter(|command| command.starts_with("lpadmin"))
            .collect()
    }

    pub(crate) fn clear_log(&self) {
        self.state.lock().unwrap().log.clear();
    }
}

impl CommandRunner for FakeCups {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<CommandOutput> {
        let mut state = self.state.lock().unwrap();
        state.log.push(format!("{cmd} {}", args.join(" ")));
        let output = match cmd {
            "lpstat" => state.lpstat(args),
            "lpoptions" => state.lpoptions(args),
            "lpinfo" => state.lpinfo(args),
            "lpadmin" => state.lpadmin(args),
            other => panic!("unexpected command: {other}"),
        };
        Ok(output)
    }
}

#[derive(Debug, Default)]
struct FakeState {
    destinations: BTreeMap<String, Destination>,
    drivers: BTreeMap<String, String>,
    default_destination: Option<String>,
    poisoned_option_writes: BTreeMap<String, String>,
    log: Vec<String>,
}

#[derive(Debug, Default, Clone)]
struct Destination {
    is_class: bool,
    accepting: bool,
    cups_options: BTreeMap<String, Option<String>>,
    vendor_options: BTreeMap<String, VendorEntry>,
    members: Vec<String>,
}

#[derive(Debug, Clone)]
struct VendorEntry {
    label: String,
    values: Vec<String>,
    current: Option<String>,
}

impl Destination {
    fn printer(name: &str, uri: &str) -> Self {
        let mut cups_options = BTreeMap::new();
        cups_options.insert("device-uri".to_string(), Some(uri.to_string()));
        cups_options.insert(
            "printer-make-and-model".to_string(),
            Some("Remote Printer".to_string()),
        );
        cups_options.insert("printer-is-shared".to_string(), Some("false".to_string()));
        cups_options.insert("printer-info".to_string(), Some(name.to_string()));
        cups_options.insert("printer-location".to_string(), None);
        Self {
            is_class: false,
            accepting: true,
            cups_options,
            vendor_options: BTreeMap::new(),
            members: Vec::new(),
        }
    }

    fn class(name: &str) -> Self {
        let mut cups_options = BTreeMap::new();
        cups_options.insert("printer-is-shared".to_string(), Some("false".to_string()));
        cups_options.insert("printer-info".to_string(), Some(name.to_string()));
        cups_options.insert("printer-location".to_string(), None);
        Self {
            is_class: true,
            accepting: true,
            cups_options,
            vendor_options: BTreeMap::new(),
            members: Vec::new(),
        }
    }

    /// Route an `-o key=value` write the way CUPS does: driver options
    /// update their current selection, everything else is a plain
    /// destination attribute.
    fn set_option(&mut self, key: &str, value: &str) {
        if let Some(entry) = self.vendor_options.get_mut(key) {
            entry.current = Some(value.to_string());
        } else {
            self.cups_options
                .insert(key.to_string(), Some(value.to_string()));
        }
    }
}

impl FakeState {
    fn destination_mut(&mut self, name: &str) -> &mut Destination {
        self.destinations
            .get_mut(name)
            .unwrap_or_else(|| panic!("no destination named {name}"))
    }

    fn lpstat(&self, args: &[&str]) -> CommandOutput {
        match args {
            ["-r"] => ok("scheduler is running\n".to_string()),
            ["-p", name] => match self.destinations.get(*name) {
                Some(destination) => {
                    let status = if destination.accepting { "idle" } else { "paused" };
                    ok(format!(
                        "printer {name} is {status}.  enabled since Thu 01 Jan 1970\n"
                    ))
                }
                None => fail(&format!(
                    "lpstat: Invalid destination name in list \"{name}\"."
                )),
            },
            ["-c", name] => match self.destinations.get(*name) {
                Some(destination) if destination.is_class => {
                    let mut text = format!("members of class {name}:\n");
                    for member in &destination.members {
                        text.push('\t');
                        text.push_str(member);
                        text.push('\n');
                    }
                    ok(text)
                }
                _ => fail(&format!("lpstat: Class \"{name}\" not known.")),
            },
            ["-a"] => {
                if self.destinations.is_empty() {
                    fail("lpstat: No destinations added.")
                } else {
                    let mut text = String::new();
                    for name in self.destinations.keys() {
                        text.push_str(name);
                        text.push_str(" accepting requests since Thu 01 Jan 1970\n");
                    }
                    ok(text)
                }
            }
            other => panic!("unexpected lpstat arguments: {other:?}"),
        }
    }

    fn lpoptions(&self, args: &[&str]) -> CommandOutput {
        match args {
            ["-p", name] => match self.destinations.get(*name) {
                Some(destination) => {
                    let rendered: Vec<String> = destination
                        .cups_options
                        .iter()
                        .map(|(key, value)| render_option(key, value.as_deref()))
                        .collect();
                    ok(rendered.join(" "))
                }
                None => fail("lpoptions: Unknown printer or class."),
            },
            ["-p", name, "-l"] => match self.destinations.get(*name) {
                Some(destination) => {
                    let mut text = String::new();
                    for (key, entry) in &destination.vendor_options {
                        text.push_str(key);
                        text.push('/');
                        text.push_str(&entry.label);
                        text.push_str(": ");
                        text.push_str(&render_vendor_values(entry));
                        text.push('\n');
                    }
                    ok(text)
                }
                None => fail("lpoptions: Unknown printer or class."),
            },
            other => panic!("unexpected lpoptions arguments: {other:?}"),
        }
    }

    fn lpinfo(&self, args: &[&str]) -> CommandOutput {
        assert_eq!(args, ["-l", "-m"], "unexpected lpinfo arguments");
        let mut text = String::new();
        for (name, make_and_model) in &self.drivers {
            text.push_str(&format!("Model:  name = {name}\n"));
            text.push_str("        natural_language = en\n");
            text.push_str(&format!("        make-and-model = {make_and_model}\n"));
            text.push_str("        device-id = MFG:Generic;MDL:Driver;\n");
        }
        ok(text)
    }

    fn lpadmin(&mut self, args: &[&str]) -> CommandOutput {
        if let Some(position) = args.iter().position(|a| *a == "-x") {
            let name = args[position + 1];
            return if self.destinations.remove(name).is_some() {
                ok(String::new())
            } else {
                fail("lpadmin: The printer or class does not exist.")
            };
        }
        if args.contains(&"-v") {
            return self.apply_install(args);
        }
        if args.contains(&"-c") {
            return self.apply_member_add(args);
        }
        self.apply_settings(args)
    }

    fn apply_install(&mut self, args: &[&str]) -> CommandOutput {
        let flags = AdminFlags::parse(args);
        let name = flags.name.expect("lpadmin install without -p");
        let uri = flags.uri.expect("lpadmin install without -v");

        let make_and_model = if let Some(model) = flags.model {
            if model == "raw" {
                "Remote Printer".to_string()
            } else if let Some(found) = self.drivers.get(model) {
                found.clone()
            } else {
                return fail("lpadmin: Unable to find the requested driver.");
            }
        } else if flags.ppd.is_some() {
            "Custom Printer".to_string()
        } else {
            "Remote Printer".to_string()
        };

        let mut destination = Destination::printer(name, uri);
        destination
            .cups_options
            .insert("printer-make-and-model".to_string(), Some(make_and_model));
        destination.accepting = flags.enable;
        if let Some(info) = flags.info {
            destination
                .cups_options
                .insert("printer-info".to_string(), Some(info.to_string()));
        }
        if let Some(location) = flags.location {
            destination
                .cups_options
                .insert("printer-location".to_string(), Some(location.to_string()));
        }
        for (key, value) in flags.options.iter().copied() {
            destination.set_option(key, value);
        }
        if let Some(default_name) = flags.default_name {
            self.default_destination = Some(default_name.to_string());
        }
        self.destinations.insert(name.to_string(), destination);
        ok(String::new())
    }

    fn apply_member_add(&mut self, args: &[&str]) -> CommandOutput {
        let flags = AdminFlags::parse(args);
        let member = flags.name.expect("lpadmin member add without -p");
        let class_name = flags.member_class.expect("lpadmin member add without -c");

        if !self.destinations.contains_key(member) {
            return fail("lpadmin: The printer or class does not exist.");
        }
        let class = self
            .destinations
            .entry(class_name.to_string())
            .or_insert_with(|| Destination::class(class_name));
        if !class.members.iter().any(|m| m == member) {
            class.members.push(member.to_string());
        }
        ok(String::new())
    }

    fn apply_settings(&mut self, args: &[&str]) -> CommandOutput {
        let flags = AdminFlags::parse(args);
        let name = flags.name.expect("lpadmin without -p");

        if let Some(stderr) = self.poisoned_option_writes.get(name) {
            return CommandOutput {
                status: 0,
                stdout: String::new(),
                stderr: stderr.clone(),
            };
        }
        let Some(destination) = self.destinations.get_mut(name) else {
            return fail("lpadmin: The printer or class does not exist.");
        };

        if flags.enable {
            destination.accepting = true;
        }
        for (key, value) in flags.options.iter().copied() {
            destination.set_option(key, value);
        }
        if let Some(info) = flags.info {
            destination
                .cups_options
                .insert("printer-info".to_string(), Some(info.to_string()));
        }
        if let Some(location) = flags.location {
            destination
                .cups_options
                .insert("printer-location".to_string(), Some(location.to_string()));
        }
        if let Some(default_name) = flags.default_name {
            self.default_destination = Some(default_name.to_string());
        }
        ok(String::new())
    }
}

#[derive(Debug, Default)]
struct AdminFlags<'a> {
    name: Option<&'a str>,
    uri: Option<&'a str>,
    enable: bool,
    options: Vec<(&'a str, &'a str)>,
    model: Option<&'a str>,
    ppd: Option<&'a str>,
    info: Option<&'a str>,
    location: Option<&'a str>,
    default_name: Option<&'a str>,
    member_class: Option<&'a str>,
}

impl<'a> AdminFlags<'a> {
    fn parse(args: &[&'a str]) -> Self {
        let mut flags = Self::default();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match *arg {
                "-p" => flags.name = iter.next().copied(),
                "-v" => flags.uri = iter.next().copied(),
                "-E" => flags.enable = true,
                "-o" => {
                    let pair = iter.next().expect("-o without a value");
                    let (key, value) = pair.split_once('=').expect("option without '='");
                    flags.options.push((key, value));
                }
                "-m" => flags.model = iter.next().copied(),
                "-P" => flags.ppd = iter.next().copied(),
                "-D" => flags.info = iter.next().copied(),
                "-L" => flags.location = iter.next().copied(),
                "-d" => flags.default_name = iter.next().copied(),
                "-c" => flags.member_class = iter.next().copied(),
                other => panic!("unexpected lpadmin flag: {other}"),
            }
        }
        flags
    }
}

/// Render one option the way `lpoptions` prints it: bare key for a
/// valueless flag, single quotes around values with whitespace.
fn render_option(key: &str, value: Option<&str>) -> String {
    match value {
        None => key.to_string(),
        Some("") => format!("{key}=''"),
        Some(v) if v.chars().any(char::is_whitespace) => format!("{key}='{v}'"),
        Some(v) => format!("{key}={v}"),
    }
}

fn render_vendor_values(entry: &VendorEntry) -> String {
    let mut rendered: Vec<String> = entry
        .values
        .iter()
        .map(|value| {
            if entry.current.as_deref() == Some(value.as_str()) {
                format!("*{value}")
            } else {
                value.clone()
            }
        })
        .collect();
    if let Some(current) = &entry.current {
        if !entry.values.contains(current) {
            rendered.push(format!("*{current}"));
        }
    }
    rendered.join(" ")
}

fn ok(stdout: String) -> CommandOutput {
    CommandOutput {
        status: 0,
        stdout,
        stderr: String::new(),
    }
}

fn fail(stderr: &str) -> CommandOutput {
    CommandOutput {
        status: 1,
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendered_options_round_trip_through_parser() {
        let cups = FakeCups::new();
        cups.add_printer("office", "socket://127.0.0.1:9100");
        cups.set_cups_option("office", "printer-info", Some("Front Desk Printer"));

        let output = cups.run("lpoptions", &["-p", "office"]).unwrap();
        let options = crate::parse::parse_option_list(&output.stdout).unwrap();
        assert_eq!(
            options.get("printer-info"),
            Some(&Some("Front Desk Printer".to_string()))
        );
        assert_eq!(options.get("printer-location"), Some(&None));
    }

    #[test]
    fn test_install_creates_queue_and_marks_default() {
        let cups = FakeCups::new();
        let output = cups
            .run(
                "lpadmin",
                &[
                    "-p", "office", "-v", "lpd://host/", "-E", "-o",
                    "printer-is-shared=true", "-d", "office",
                ],
            )
            .unwrap();

        assert!(output.success());
        assert!(cups.contains("office"));
        assert_eq!(cups.default_destination().as_deref(), Some("office"));
    }

    #[test]
    fn test_unknown_model_install_fails_without_creating_queue() {
        let cups = FakeCups::new();
        let output = cups
            .run(
                "lpadmin",
                &["-p", "office", "-v", "lpd://host/", "-m", "drv:///nope.ppd"],
            )
            .unwrap();

        assert!(!output.success());
        assert!(!output.stderr.is_empty());
        assert!(!cups.contains("office"));
    }
}
