//! Built-in entity taggers.
//!
//! Each family is an ordered list of case-insensitive rules that rewrite recognized entities into
//! canonical tags of the form `<TYPE: value>`. The order within a family matters: later rules only
//! see text that earlier rules did not turn into a tag.

use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::pattern::compile_raw;
use crate::substitution::{Batch, Rule, map_patterns};

macro_rules! month {
    () => {
        "(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)"
    };
}

macro_rules! day {
    () => {
        "(31|[123]0|[012]?[1-9])"
    };
}

macro_rules! year {
    (short) => {
        "((?:2[01]|1[89])?\\d\\d)"
    };
    (full) => {
        "((?:2[01]|1[89])\\d\\d)"
    };
}

/// Rejects matches followed by a percentage or a measurement unit.
macro_rules! not_measured {
    () => {
        "(?!\\s+[%hk])"
    };
}

macro_rules! rules {
    ($name:ident, [$(($pattern:expr, $template:expr)),+ $(,)?]) => {
        static $name: LazyLock<Vec<Rule>> = LazyLock::new(|| {
            vec![$(Rule::template(compile_raw($pattern, true).unwrap(), $template)),+]
        });
    };
}

rules!(
    DATETIME_RULES,
    [
        // 12/03/21, 1.3.2021
        (
            concat!(
                "\\b",
                day!(),
                "\\s*[-/.]+\\s*(0?\\d|1[012])\\s*[-/.]?\\s*",
                year!(short),
                "\\b",
                not_measured!()
            ),
            " <DTM: ${1}/${2}/${3}> "
        ),
        // 5th January 2021
        (
            concat!(
                "\\b",
                day!(),
                "\\s*(?:st|nd|rd|th)?[-/.\\s]*(",
                month!(),
                "\\w*)[-/.,\\s]*",
                year!(short),
                "\\b",
                not_measured!()
            ),
            " <DTM: ${1}/${2}/${3}> "
        ),
        // 5th January
        (
            concat!(
                "\\b(?<!<\\w{3}:\\s)",
                day!(),
                "\\s*(?:st|nd|rd|th)?[-/.\\s]*(",
                month!(),
                "\\w*)",
                not_measured!()
            ),
            " <DTM: ${1}/${2}/yyyy> "
        ),
        // January 2021
        (
            concat!(
                "\\b(?<!<\\w{3}:\\s\\d\\d/)(?<!<\\w{3}:\\s\\d/)(",
                month!(),
                "\\w*)[-/.\\s]*",
                year!(short),
                not_measured!()
            ),
            " <DTM: dd/${1}/${2}> "
        ),
        // January 5th
        (
            concat!(
                "\\b(?<!<\\w{3}:\\s\\d\\d/)(?<!<\\w{3}:\\s\\d/)(?<!<\\w{3}:\\sdd/)(",
                month!(),
                "\\w*)[-/.\\s]*",
                day!(),
                "\\s*(?:st|nd|rd|th)?",
                not_measured!()
            ),
            " <DTM: ${2}/${1}/yyyy> "
        ),
    ]
);

rules!(
    REFERENCE_RULES,
    [
        // Shutdown years, such as "shutdown 2019" or "sd-2021".
        (
            concat!("\\b(?:s[hut]{0,3}d[own]{0,3})[-/._\\s]*", year!(full)),
            " <ABV: SD${1}> "
        ),
        ("\\b(?<=remaining)[-/._\\s]*(\\d?\\d)\\b", " <REF: ${1}> "),
        ("\\b([jtkm]-?[12359][05]?)\\b", " <REF: ${1}> "),
        (
            "\\b(nr_[-/._\\s]*2|pdm1|pd[-\\s]+m1|[ep]sd[-\\s]*[12])\\b",
            " <REF: ${1}> "
        ),
    ]
);

rules!(
    HOUR_RULES,
    [(
        concat!(
            "(?<![a-qt-z]-)\\b([01][0-9]|2[0-3])[.:\\s]*([0-5][0-9])",
            "(?:\\s*h[ou]{0,2}rs?)?\\b(?!>|\\s+[%hk])"
        ),
        " <HRS: ${1}:${2}> "
    )]
);

rules!(
    DURATION_RULES,
    [(
        "\\b(?<!-)(\\d\\d?(?:\\s*[-.,]\\s*\\d+)?)(?!-)\\s*(?:h[ou]{0,2}rs?)",
        " <DUR: ${1} hrs> "
    )]
);

rules!(
    UOM_RULES,
    [(
        "\\b(\\d+\\s*oo\\s*\\d+)[.\\s]*(turns?)?\\b",
        " <UOM: ${1}${2}> "
    )]
);

rules!(
    TAG_RULES,
    [(
        concat!(
            "\\b((?:tg|gt)g?|[lhipmge][cg]?[fdxbvist]|v|g|[lpfems][aswldoc][hlwdv][hlp]?)",
            "[-#\\s]*(\\d{3,4}-?(?:[-/\\s]*[a-f]+)*)(?:\\s|$|\\.)(?![%hk])"
        ),
        " <TAG: ${1}-${2}> "
    )]
);

/// A family of built-in entity taggers.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaggerFamily {
    /// Dates, tagged as `<DTM: d/m/y>` with `dd` or `yyyy` for missing parts.
    Datetime,
    /// Shutdown years and reference codes, tagged as `<ABV: ..>` and `<REF: ..>`.
    Reference,
    /// Times of day, tagged as `<HRS: HH:MM>`.
    Hour,
    /// Durations in hours, tagged as `<DUR: n hrs>`.
    Duration,
    /// Voting ratios such as `2oo3`, tagged as `<UOM: ..>`.
    Uom,
    /// Equipment tags, tagged as `<TAG: prefix-number>`.
    Tag,
}

impl TaggerFamily {
    /// All families in their default processing order.
    pub const ALL: [TaggerFamily; 6] = [
        TaggerFamily::Datetime,
        TaggerFamily::Reference,
        TaggerFamily::Tag,
        TaggerFamily::Hour,
        TaggerFamily::Duration,
        TaggerFamily::Uom,
    ];

    /// Returns the ordered rules of this family.
    pub fn rules(self) -> &'static [Rule] {
        match self {
            TaggerFamily::Datetime => DATETIME_RULES.as_slice(),
            TaggerFamily::Reference => REFERENCE_RULES.as_slice(),
            TaggerFamily::Hour => HOUR_RULES.as_slice(),
            TaggerFamily::Duration => DURATION_RULES.as_slice(),
            TaggerFamily::Uom => UOM_RULES.as_slice(),
            TaggerFamily::Tag => TAG_RULES.as_slice(),
        }
    }

    /// Applies the rules of this family to every value of the batch.
    pub fn apply<K>(self, batch: &mut Batch<K>) {
        map_patterns(batch, self.rules());
    }

    /// Returns the name of the family.
    pub fn as_str(self) -> &'static str {
        match self {
            TaggerFamily::Datetime => "datetime",
            TaggerFamily::Reference => "reference",
            TaggerFamily::Hour => "hour",
            TaggerFamily::Duration => "duration",
            TaggerFamily::Uom => "uom",
            TaggerFamily::Tag => "tag",
        }
    }
}

impl fmt::Display for TaggerFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use crate::substitution::apply_rules;

    use super::*;

    macro_rules! assert_tagged {
        ($family:ident, $input:literal, $output:literal) => {
            assert_eq!(apply_rules($input, TaggerFamily::$family.rules()), $output);
        };
    }

    #[test]
    fn test_all_rules_compile() {
        for family in TaggerFamily::ALL {
            assert!(!family.rules().is_empty(), "{family} has no rules");
        }
    }

    #[test]
    fn test_rule_counts() {
        assert_eq!(TaggerFamily::Datetime.rules().len(), 5);
        assert_eq!(TaggerFamily::Reference.rules().len(), 4);
        assert_eq!(TaggerFamily::Hour.rules().len(), 1);
        assert_eq!(TaggerFamily::Duration.rules().len(), 1);
        assert_eq!(TaggerFamily::Uom.rules().len(), 1);
        assert_eq!(TaggerFamily::Tag.rules().len(), 1);
    }

    #[test]
    fn test_date_numeric() {
        assert_tagged!(Datetime, "12/03/21", "<DTM: 12/03/21>");
        assert_tagged!(Datetime, "done 1.3.2021 ok", "done <DTM: 1/3/2021> ok");
    }

    #[test]
    fn test_date_day_month_year() {
        assert_tagged!(
            Datetime,
            "inspected on 5th January 2021",
            "inspected on <DTM: 5/January/2021>"
        );
    }

    #[test]
    fn test_date_day_month() {
        assert_tagged!(Datetime, "5 Jan", "<DTM: 5/Jan/yyyy>");
    }

    #[test]
    fn test_date_month_year() {
        assert_tagged!(Datetime, "Jan 2021", "<DTM: dd/Jan/2021>");
    }

    #[test]
    fn test_date_month_day() {
        assert_tagged!(Datetime, "Jan 5", "<DTM: 5/Jan/yyyy>");
    }

    #[test]
    fn test_date_measured_is_skipped() {
        assert_tagged!(Datetime, "12-05-21 %", "12-05-21 %");
    }

    #[test]
    fn test_date_already_tagged() {
        assert_tagged!(Datetime, "<DTM: 5/Jan/yyyy>", "<DTM: 5/Jan/yyyy>");
    }

    #[test]
    fn test_reference_shutdown() {
        assert_tagged!(Reference, "shutdown 2019 works", "<ABV: SD2019> works");
        assert_tagged!(Reference, "during sd-2021", "during <ABV: SD2021>");
    }

    #[test]
    fn test_reference_remaining() {
        assert_tagged!(Reference, "2 days remaining 5", "2 days remaining <REF: 5>");
    }

    #[test]
    fn test_reference_codes() {
        assert_tagged!(Reference, "t-10 valve", "<REF: t-10> valve");
        assert_tagged!(Reference, "psd 1 trip", "<REF: psd 1> trip");
        assert_tagged!(Reference, "PDM1 alarm", "<REF: PDM1> alarm");
    }

    #[test]
    fn test_hour() {
        assert_tagged!(Hour, "start at 14:30 today", "start at <HRS: 14:30> today");
        assert_tagged!(Hour, "0930 hrs", "<HRS: 09:30>");
    }

    #[test]
    fn test_hour_skips_tags() {
        assert_tagged!(
            Hour,
            "<TAG: pv-1234> at 1230",
            "<TAG: pv-1234> at <HRS: 12:30>"
        );
    }

    #[test]
    fn test_hour_skips_hyphenated_codes() {
        assert_tagged!(Hour, "pv-12 30", "pv-12 30");
        assert_tagged!(Hour, "at 12 30", "at <HRS: 12:30>");
    }

    #[test]
    fn test_duration() {
        assert_tagged!(Duration, "took 3 hrs", "took <DUR: 3 hrs>");
        assert_tagged!(Duration, "2-3 hours", "<DUR: 2-3 hrs>");
    }

    #[test]
    fn test_duration_skips_hyphens() {
        assert_tagged!(Duration, "pv-3 hrs", "pv-3 hrs");
        assert_tagged!(Duration, "3- hrs", "3- hrs");
    }

    #[test]
    fn test_uom() {
        assert_tagged!(Uom, "2oo3 voting", "<UOM: 2oo3> voting");
        assert_tagged!(Uom, "3oo4 turns", "<UOM: 3oo4turns>");
    }

    #[test]
    fn test_tag() {
        assert_tagged!(Tag, "pv 1234 replaced", "<TAG: pv-1234> replaced");
        assert_tagged!(Tag, "replaced psv-1234.", "replaced <TAG: psv-1234>");
    }

    #[test]
    fn test_tag_measured_is_skipped() {
        assert_tagged!(Tag, "pv 1234 %", "pv 1234 %");
    }

    #[test]
    fn test_tag_backtracking_leaves_text() {
        let text = format!("pv 1234{}z", "ab".repeat(20));
        assert_eq!(apply_rules(&text, TaggerFamily::Tag.rules()), text);
    }

    #[test]
    fn test_apply_batch() {
        let mut batch = Batch::from([
            ("a", "pv 1234 replaced".to_owned()),
            ("b", "no tags here".to_owned()),
        ]);
        TaggerFamily::Tag.apply(&mut batch);

        assert_eq!(batch["a"], "<TAG: pv-1234> replaced");
        assert_eq!(batch["b"], "no tags here");
    }
}
