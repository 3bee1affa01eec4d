// ── Command output parsing ──
//
// Turns raw device CLI text into canonical VLAN records. Grammars are
// looked up by (command, device type); unknown combinations yield
// `ParseOutput::Unsupported` rather than an error.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::model::VlanRecord;

/// Result of parsing one device's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutput {
    /// Records in the order the device listed them. May be empty.
    Records(Vec<VlanRecord>),
    /// No grammar is registered for the (command, device type) pair.
    Unsupported,
}

impl ParseOutput {
    pub fn into_records(self) -> Vec<VlanRecord> {
        match self {
            Self::Records(records) => records,
            Self::Unsupported => Vec::new(),
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported)
    }

    /// True for `Unsupported` and for a supported grammar that found nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Records(records) => records.is_empty(),
            Self::Unsupported => true,
        }
    }
}

/// A parser for one output layout.
pub trait Grammar: Send + Sync {
    fn name(&self) -> &'static str;

    /// Never fails: lines the grammar does not recognise are dropped.
    fn parse(&self, raw: &str) -> Vec<VlanRecord>;
}

// ── Tabular summary grammar ──────────────────────────────────────────

static SUMMARY_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\s+(\S+)\s+\S+.*$").expect("VLAN summary row pattern is valid")
});

/// Start of the per-VLAN attribute table that `show vlan` prints after the
/// summary. Its rows (`1    enet  100001 ...`) also look like summary rows.
const ATTRIBUTE_TABLE_HEADER: &str = "VLAN Type";

/// The `VLAN Name Status Ports` table printed by IOS, IOS-XE, NX-OS and EOS.
#[derive(Debug, Clone, Copy, Default)]
pub struct TabularSummary;

impl Grammar for TabularSummary {
    fn name(&self) -> &'static str {
        "tabular-summary"
    }

    fn parse(&self, raw: &str) -> Vec<VlanRecord> {
        let mut seen = HashSet::new();
        let mut records = Vec::new();

        for line in raw.lines() {
            let line = line.trim_end();
            if line.starts_with(ATTRIBUTE_TABLE_HEADER) {
                break;
            }
            let Some(caps) = SUMMARY_ROW.captures(line) else {
                continue;
            };
            let id = &caps[1];
            if seen.insert(id.to_owned()) {
                records.push(VlanRecord::new(id, &caps[2]));
            }
        }
        records
    }
}

// ── Registry ─────────────────────────────────────────────────────────

/// Grammar registry keyed by normalised command and exact device type.
pub struct OutputParser {
    grammars: HashMap<(String, String), Arc<dyn Grammar>>,
}

impl OutputParser {
    /// A registry with no grammars.
    pub fn empty() -> Self {
        Self {
            grammars: HashMap::new(),
        }
    }

    pub fn register(&mut self, command: &str, device_type: &str, grammar: Arc<dyn Grammar>) {
        self.grammars
            .insert((normalize_command(command), device_type.to_owned()), grammar);
    }

    pub fn supports(&self, command: &str, device_type: &str) -> bool {
        self.grammar_for(command, device_type).is_some()
    }

    pub fn parse(&self, raw: &str, command: &str, device_type: &str) -> ParseOutput {
        match self.grammar_for(command, device_type) {
            Some(grammar) => ParseOutput::Records(grammar.parse(raw)),
            None => ParseOutput::Unsupported,
        }
    }

    fn grammar_for(&self, command: &str, device_type: &str) -> Option<&Arc<dyn Grammar>> {
        self.grammars
            .get(&(normalize_command(command), device_type.to_owned()))
    }
}

impl Default for OutputParser {
    fn default() -> Self {
        let mut parser = Self::empty();
        let summary: Arc<dyn Grammar> = Arc::new(TabularSummary);
        for device_type in ["cisco_ios", "cisco_xe", "arista_eos"] {
            parser.register("show vlan", device_type, Arc::clone(&summary));
        }
        for device_type in ["cisco_ios", "cisco_xe", "cisco_nxos"] {
            parser.register("show vlan brief", device_type, Arc::clone(&summary));
        }
        parser
    }
}

impl fmt::Debug for OutputParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self
            .grammars
            .iter()
            .map(|((cmd, dt), g)| format!("{cmd} / {dt} => {}", g.name()))
            .collect();
        keys.sort();
        f.debug_struct("OutputParser").field("grammars", &keys).finish()
    }
}

static BUILTIN: LazyLock<OutputParser> = LazyLock::new(OutputParser::default);

/// Parse with the built-in grammar set.
pub fn parse(raw: &str, command: &str, device_type: &str) -> ParseOutput {
    BUILTIN.parse(raw, command, device_type)
}

fn normalize_command(command: &str) -> String {
    command
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::DEFAULT_DESCRIPTION;

    const IOS_SHOW_VLAN: &str = "\
VLAN Name                             Status    Ports
---- -------------------------------- --------- -------------------------------
1    default                          active    Gi0/1, Gi0/2, Gi0/3
                                                Gi0/4
110  users                            active    Gi0/5
120  voice                            act/lshut
1002 fddi-default                     act/unsup
1003 token-ring-default               act/unsup

VLAN Type  SAID       MTU   Parent RingNo BridgeNo Stp  BrdgMode Trans1 Trans2
---- ----- ---------- ----- ------ ------ -------- ---- -------- ------ ------
1    enet  100001     1500  -      -      -        -    -        0      0
110  enet  100110     1500  -      -      -        -    -        0      0
";

    fn ids(records: &[VlanRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn parses_summary_table_and_stops_at_type_table() {
        let out = parse(IOS_SHOW_VLAN, "show vlan", "cisco_ios");
        let records = out.into_records();
        assert_eq!(ids(&records), vec!["1", "110", "120", "1002", "1003"]);
        assert_eq!(records[1].name, "users");
        assert!(records.iter().all(|r| r.description == DEFAULT_DESCRIPTION));
        assert!(records.iter().all(|r| r.name != "enet"));
    }

    #[test]
    fn tolerates_crlf_line_endings() {
        let raw = IOS_SHOW_VLAN.replace('\n', "\r\n");
        let records = parse(&raw, "show vlan", "cisco_ios").into_records();
        assert_eq!(records.len(), 5);
        assert_eq!(records[0], VlanRecord::new("1", "default"));
    }

    #[test]
    fn duplicate_ids_keep_first_occurrence() {
        let raw = "10   first    active\n10   second   active\n20   other    active\n";
        let records = TabularSummary.parse(raw);
        assert_eq!(
            records,
            vec![VlanRecord::new("10", "first"), VlanRecord::new("20", "other")]
        );
    }

    #[test]
    fn row_needs_a_status_column() {
        assert!(TabularSummary.parse("10   lonely\n").is_empty());
        assert!(TabularSummary.parse("   10 indented active\n").is_empty());
    }

    #[test]
    fn unsupported_pair_is_not_an_error() {
        let out = parse(IOS_SHOW_VLAN, "show vlan", "juniper_junos");
        assert!(out.is_unsupported());
        assert!(out.is_empty());
        assert!(out.into_records().is_empty());

        assert!(parse("", "show interfaces", "cisco_ios").is_unsupported());
    }

    #[test]
    fn command_lookup_normalises_whitespace_and_case() {
        let parser = OutputParser::default();
        assert!(parser.supports("  SHOW   Vlan  brief ", "cisco_nxos"));
        assert!(!parser.supports("show vlan", "cisco_nxos"));
        assert!(!parser.supports("show vlan", "CISCO_IOS"));
    }

    #[test]
    fn supported_grammar_with_no_rows_is_empty_records() {
        let out = parse("% Invalid input detected\n", "show vlan", "cisco_ios");
        assert_eq!(out, ParseOutput::Records(Vec::new()));
        assert!(out.is_empty());
        assert!(!out.is_unsupported());
    }

    #[test]
    fn custom_grammar_can_be_registered() {
        struct Fixed;
        impl Grammar for Fixed {
            fn name(&self) -> &'static str {
                "fixed"
            }
            fn parse(&self, _raw: &str) -> Vec<VlanRecord> {
                vec![VlanRecord::new("7", "seven")]
            }
        }

        let mut parser = OutputParser::empty();
        parser.register("show vlans", "juniper_junos", Arc::new(Fixed));
        let records = parser
            .parse("anything", "show vlans", "juniper_junos")
            .into_records();
        assert_eq!(records, vec![VlanRecord::new("7", "seven")]);
        assert!(format!("{parser:?}").contains("fixed"));
    }

    #[test]
    fn nxos_brief_output() {
        let raw = "\
VLAN Name                             Status    Ports
---- -------------------------------- --------- -------------------------------
1    default                          active    Eth1/1, Eth1/2
30   storage                          active    Eth1/10
";
        let records = parse(raw, "show vlan brief", "cisco_nxos").into_records();
        assert_eq!(ids(&records), vec!["1", "30"]);
    }
}
