//! # Time-Expression Extractor
//!
//! Finds the first natural-language date/time expression in free text and
//! resolves it to an absolute instant. Only instants strictly after `now`
//! are returned; parse failures are logged and treated as "no match" so
//! extraction can never block task creation.
//!
//! Recognised forms:
//! - relative offsets: `in 30 minutes`, `in an hour`, `in half an hour`, `in 2 weeks`
//! - day words: `today`, `tonight`, `tomorrow`, `day after tomorrow`
//! - weekdays with optional `next`/`this`/`on`/`coming`
//! - calendar dates: `2025-01-21`, `2025-01-21 17:30`, `Jan 21`, `21st of March 2026`
//! - clock times: `5pm`, `10:30 a.m.`, `17:30`, `noon`, `midnight`
//!
//! A day may be followed (`tomorrow at 5pm`, `friday evening`) or preceded
//! (`5pm tomorrow`) by a time. Days without a time resolve to 09:00, `tonight`
//! to 20:00. A bare clock time means today.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.2.0: Calendar dates with month names
//! - 1.1.0: Time-before-day ordering (`5pm tomorrow`)
//! - 1.0.0: Initial release

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, NaiveTime, Offset, TimeZone,
    Utc,
};
use log::{debug, warn};
use regex::{Captures, Regex};
use std::sync::OnceLock;
use thiserror::Error;

use crate::features::tasks::Task;

const MONTH: &str = r"(?P<month>jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)";

/// Reasons a matched expression could not be resolved. Never escapes `extract`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseFailure {
    #[error("Invalid time of day: {0}")]
    InvalidClock(String),

    #[error("Invalid calendar date: {0}")]
    InvalidDate(String),

    #[error("Offset out of range: {0}")]
    OutOfRange(String),

    #[error("Pattern failed to compile: {0}")]
    Pattern(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Relative,
    IsoDate,
    DayWord,
    Weekday,
    MonthDay,
    DayMonth,
    Clock,
}

const DAY_KINDS: &[Kind] = &[
    Kind::IsoDate,
    Kind::DayWord,
    Kind::Weekday,
    Kind::MonthDay,
    Kind::DayMonth,
];

const ALL_KINDS: &[Kind] = &[
    Kind::Relative,
    Kind::IsoDate,
    Kind::DayWord,
    Kind::Weekday,
    Kind::MonthDay,
    Kind::DayMonth,
    Kind::Clock,
];

struct Candidate<'t> {
    kind: Kind,
    start: usize,
    end: usize,
    caps: Captures<'t>,
}

/// Time of day, with `midnight` rolling over to the following date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Clock {
    time: NaiveTime,
    next_day: bool,
}

impl Clock {
    fn hm(hour: u32, minute: u32) -> Result<Self, ParseFailure> {
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(|time| Clock {
                time,
                next_day: false,
            })
            .ok_or_else(|| ParseFailure::InvalidClock(format!("{hour:02}:{minute:02}")))
    }
}

struct Patterns {
    relative: Regex,
    iso_date: Regex,
    day_word: Regex,
    weekday: Regex,
    month_day: Regex,
    day_month: Regex,
    clock: Regex,
    part_of_day: Regex,
    day_then_clock_gap: Regex,
    clock_then_day_gap: Regex,
}

impl Patterns {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Patterns {
            relative: Regex::new(
                r"(?i)\bin\s+(?:(?P<half>half\s+an?\s+hour)|(?P<n>\d+|an?|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve|fifteen|twenty|thirty|forty-five|forty|fifty|sixty)\s*(?P<unit>minutes?|mins?|hours?|hrs?|days?|weeks?|months?)\b)",
            )?,
            iso_date: Regex::new(
                r"\b(?P<y>\d{4})-(?P<mo>\d{1,2})-(?P<d>\d{1,2})(?:(?:T|\s+)(?P<h>\d{1,2}):(?P<mi>\d{2}))?\b",
            )?,
            day_word: Regex::new(
                r"(?i)\b(?P<word>day\s+after\s+tomorrow|today|tonight|tomorrow|tmrw)\b",
            )?,
            weekday: Regex::new(
                r"(?i)\b(?:(?P<qual>next|this|on|coming)\s+)?(?P<day>monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b",
            )?,
            month_day: Regex::new(&format!(
                r"(?i)\b{MONTH}\.?\s+(?P<d>\d{{1,2}})(?:st|nd|rd|th)?(?:,?\s+(?P<y>\d{{4}}))?\b"
            ))?,
            day_month: Regex::new(&format!(
                r"(?i)\b(?P<d>\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?{MONTH}\b(?:,?\s+(?P<y>\d{{4}})\b)?"
            ))?,
            clock: Regex::new(
                r"(?i)\b(?:(?P<h12>\d{1,2})(?::(?P<m12>\d{2}))?\s*(?P<ampm>[ap])\.?m\b\.?|(?P<h24>\d{1,2}):(?P<m24>\d{2})\b|(?P<word>noon|midnight)\b)",
            )?,
            part_of_day: Regex::new(
                r"(?i)^\s*(?:in\s+the\s+|at\s+)?(?P<part>morning|afternoon|evening|night)\b",
            )?,
            day_then_clock_gap: Regex::new(r"(?i)^\s*,?\s*(?:at|@|by|around)?\s*$")?,
            clock_then_day_gap: Regex::new(r"(?i)^\s*,?\s*(?:on\s*)?$")?,
        })
    }

    fn regex(&self, kind: Kind) -> &Regex {
        match kind {
            Kind::Relative => &self.relative,
            Kind::IsoDate => &self.iso_date,
            Kind::DayWord => &self.day_word,
            Kind::Weekday => &self.weekday,
            Kind::MonthDay => &self.month_day,
            Kind::DayMonth => &self.day_month,
            Kind::Clock => &self.clock,
        }
    }

    /// Leftmost match at or after `from` among `kinds`; longest wins a tie
    fn earliest<'t>(&self, text: &'t str, from: usize, kinds: &[Kind]) -> Option<Candidate<'t>> {
        kinds
            .iter()
            .filter_map(|&kind| {
                let caps = self.regex(kind).captures_at(text, from)?;
                let whole = caps.get(0)?;
                Some(Candidate {
                    kind,
                    start: whole.start(),
                    end: whole.end(),
                    caps,
                })
            })
            .min_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)))
    }
}

static PATTERNS: OnceLock<Result<Patterns, String>> = OnceLock::new();

fn patterns() -> Result<&'static Patterns, ParseFailure> {
    PATTERNS
        .get_or_init(|| Patterns::compile().map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|e| ParseFailure::Pattern(e.clone()))
}

/// Resolves time expressions against a fixed local offset (UTC by default)
#[derive(Debug, Clone, Copy)]
pub struct TimeExpressionExtractor {
    offset: FixedOffset,
}

impl Default for TimeExpressionExtractor {
    fn default() -> Self {
        TimeExpressionExtractor { offset: Utc.fix() }
    }
}

impl TimeExpressionExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interpret wall-clock expressions ("5pm", "tomorrow") in `offset`
    pub fn with_offset(offset: FixedOffset) -> Self {
        TimeExpressionExtractor { offset }
    }

    /// First expression in `text`, if it resolves strictly after `now`
    pub fn extract(&self, text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.parse_first(text, now) {
            Ok(Some(at)) if at > now => {
                debug!("Extracted reminder time {at} from '{text}'");
                Some(at)
            }
            Ok(Some(at)) => {
                debug!("Ignoring past time {at} in '{text}'");
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Error parsing reminder time: {e}");
                None
            }
        }
    }

    /// Searches `"{title} {description}"`
    pub fn extract_from_task(&self, task: &Task, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.extract(&task.search_text(), now)
    }

    /// Resolve the first expression in `text` without the future-only filter
    pub fn parse_first(
        &self,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, ParseFailure> {
        let patterns = patterns()?;
        let local_now = now.with_timezone(&self.offset);

        let Some(first) = patterns.earliest(text, 0, ALL_KINDS) else {
            return Ok(None);
        };

        let resolved = match first.kind {
            Kind::Relative => resolve_relative(&first.caps, local_now)?,
            Kind::Clock => {
                let clock = parse_clock(&first.caps)?;
                let date = match patterns.earliest(text, first.end, DAY_KINDS) {
                    Some(day)
                        if patterns
                            .clock_then_day_gap
                            .is_match(&text[first.end..day.start]) =>
                    {
                        resolve_day(&day, local_now.date_naive())?.date
                    }
                    _ => local_now.date_naive(),
                };
                self.at(date, clock)?
            }
            _ => {
                let day = resolve_day(&first, local_now.date_naive())?;
                let clock = match day.explicit {
                    Some(clock) => clock,
                    None => trailing_clock(patterns, text, first.end)?.unwrap_or(day.default_clock),
                };
                self.at(day.date, clock)?
            }
        };

        Ok(Some(resolved))
    }

    fn at(&self, date: NaiveDate, clock: Clock) -> Result<DateTime<Utc>, ParseFailure> {
        let date = if clock.next_day {
            date.succ_opt()
                .ok_or_else(|| ParseFailure::InvalidDate(format!("day after {date}")))?
        } else {
            date
        };

        self.offset
            .from_local_datetime(&date.and_time(clock.time))
            .single()
            .map(|local| local.with_timezone(&Utc))
            .ok_or_else(|| ParseFailure::OutOfRange(format!("{date} {}", clock.time)))
    }
}

struct ResolvedDay {
    date: NaiveDate,
    default_clock: Clock,
    explicit: Option<Clock>,
}

fn morning() -> Result<Clock, ParseFailure> {
    Clock::hm(9, 0)
}

fn resolve_day(candidate: &Candidate<'_>, today: NaiveDate) -> Result<ResolvedDay, ParseFailure> {
    let caps = &candidate.caps;
    let mut explicit = None;
    let mut default_clock = morning()?;

    let date = match candidate.kind {
        Kind::IsoDate => {
            let year = number(caps, "y")? as i32;
            let month = number(caps, "mo")?;
            let day = number(caps, "d")?;
            if caps.name("h").is_some() {
                explicit = Some(Clock::hm(number(caps, "h")?, number(caps, "mi")?)?);
            }
            NaiveDate::from_ymd_opt(year, month, day)
                .ok_or_else(|| ParseFailure::InvalidDate(format!("{year}-{month:02}-{day:02}")))?
        }
        Kind::DayWord => {
            let word = caps
                .name("word")
                .map(|m| m.as_str().to_lowercase())
                .unwrap_or_default();
            let offset_days = match word.as_str() {
                "today" => 0,
                "tonight" => {
                    default_clock = Clock::hm(20, 0)?;
                    0
                }
                "tomorrow" | "tmrw" => 1,
                _ => 2, // day after tomorrow
            };
            add_days(today, offset_days)?
        }
        Kind::Weekday => {
            let target = caps
                .name("day")
                .and_then(|m| m.as_str().to_lowercase().parse::<chrono::Weekday>().ok())
                .ok_or_else(|| ParseFailure::InvalidDate("unknown weekday".to_string()))?;
            let qualifier = caps.name("qual").map(|m| m.as_str().to_lowercase());

            let mut ahead = (7 + target.num_days_from_monday() as i64
                - today.weekday().num_days_from_monday() as i64)
                % 7;
            if ahead == 0 && qualifier.as_deref() != Some("this") {
                ahead = 7;
            }
            add_days(today, ahead)?
        }
        Kind::MonthDay | Kind::DayMonth => {
            let month = caps
                .name("month")
                .map(|m| month_number(m.as_str()))
                .ok_or_else(|| ParseFailure::InvalidDate("missing month".to_string()))??;
            let day = number(caps, "d")?;

            match caps.name("y") {
                Some(_) => {
                    let year = number(caps, "y")? as i32;
                    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
                        ParseFailure::InvalidDate(format!("{year}-{month:02}-{day:02}"))
                    })?
                }
                None => {
                    // Without a year, pick the next time this date comes around
                    let this_year = NaiveDate::from_ymd_opt(today.year(), month, day);
                    match this_year {
                        Some(date) if date >= today => date,
                        _ => NaiveDate::from_ymd_opt(today.year() + 1, month, day).ok_or_else(
                            || ParseFailure::InvalidDate(format!("{month:02}-{day:02}")),
                        )?,
                    }
                }
            }
        }
        Kind::Relative | Kind::Clock => {
            return Err(ParseFailure::InvalidDate(
                "not a calendar expression".to_string(),
            ))
        }
    };

    Ok(ResolvedDay {
        date,
        default_clock,
        explicit,
    })
}

/// A time or part of day directly after a day expression
fn trailing_clock(
    patterns: &Patterns,
    text: &str,
    from: usize,
) -> Result<Option<Clock>, ParseFailure> {
    if let Some(clock) = patterns.earliest(text, from, &[Kind::Clock]) {
        if patterns
            .day_then_clock_gap
            .is_match(&text[from..clock.start])
        {
            return parse_clock(&clock.caps).map(Some);
        }
    }

    if let Some(caps) = patterns.part_of_day.captures(&text[from..]) {
        let part = caps
            .name("part")
            .map(|m| m.as_str().to_lowercase())
            .unwrap_or_default();
        let clock = match part.as_str() {
            "morning" => Clock::hm(9, 0)?,
            "afternoon" => Clock::hm(15, 0)?,
            "evening" => Clock::hm(18, 0)?,
            _ => Clock::hm(20, 0)?,
        };
        return Ok(Some(clock));
    }

    Ok(None)
}

fn parse_clock(caps: &Captures<'_>) -> Result<Clock, ParseFailure> {
    if let Some(word) = caps.name("word") {
        return match word.as_str().to_lowercase().as_str() {
            "noon" => Clock::hm(12, 0),
            _ => Clock::hm(0, 0).map(|clock| Clock {
                next_day: true,
                ..clock
            }),
        };
    }

    if caps.name("h12").is_some() {
        let hour = number(caps, "h12")?;
        let minute = match caps.name("m12") {
            Some(_) => number(caps, "m12")?,
            None => 0,
        };
        if !(1..=12).contains(&hour) {
            return Err(ParseFailure::InvalidClock(format!("{hour}:{minute:02} with am/pm")));
        }
        let is_pm = caps
            .name("ampm")
            .map(|m| m.as_str().eq_ignore_ascii_case("p"))
            .unwrap_or(false);
        let hour = match (is_pm, hour) {
            (true, 12) => 12,
            (true, h) => h + 12,
            (false, 12) => 0,
            (false, h) => h,
        };
        return Clock::hm(hour, minute);
    }

    Clock::hm(number(caps, "h24")?, number(caps, "m24")?)
}

fn resolve_relative(
    caps: &Captures<'_>,
    local_now: DateTime<FixedOffset>,
) -> Result<DateTime<Utc>, ParseFailure> {
    if caps.name("half").is_some() {
        return Ok((local_now + Duration::minutes(30)).with_timezone(&Utc));
    }

    let raw = caps.name("n").map(|m| m.as_str()).unwrap_or("1");
    let amount = count_word(raw)?;
    let unit = caps
        .name("unit")
        .map(|m| m.as_str().to_lowercase())
        .unwrap_or_default();

    let out_of_range = || ParseFailure::OutOfRange(format!("in {raw} {unit}"));

    let shifted = if unit.starts_with("month") {
        let months = u32::try_from(amount).map_err(|_| out_of_range())?;
        local_now.checked_add_months(Months::new(months))
    } else {
        let unit_seconds: i64 = if unit.starts_with("min") {
            60
        } else if unit.starts_with('h') {
            3600
        } else if unit.starts_with('d') {
            86_400
        } else {
            604_800
        };
        amount
            .checked_mul(unit_seconds)
            .and_then(Duration::try_seconds)
            .and_then(|delta| local_now.checked_add_signed(delta))
    };

    shifted
        .map(|at| at.with_timezone(&Utc))
        .ok_or_else(out_of_range)
}

fn count_word(raw: &str) -> Result<i64, ParseFailure> {
    let lower = raw.to_lowercase();
    let value = match lower.as_str() {
        "a" | "an" | "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        "fifteen" => 15,
        "twenty" => 20,
        "thirty" => 30,
        "forty" => 40,
        "forty-five" => 45,
        "fifty" => 50,
        "sixty" => 60,
        digits => digits
            .parse::<i64>()
            .map_err(|_| ParseFailure::OutOfRange(format!("count '{raw}'")))?,
    };
    Ok(value)
}

fn month_number(name: &str) -> Result<u32, ParseFailure> {
    let prefix: String = name.to_lowercase().chars().take(3).collect();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return Err(ParseFailure::InvalidDate(format!("unknown month '{name}'"))),
    };
    Ok(month)
}

fn number(caps: &Captures<'_>, group: &str) -> Result<u32, ParseFailure> {
    let raw = caps.name(group).map(|m| m.as_str()).unwrap_or("");
    raw.parse::<u32>()
        .map_err(|_| ParseFailure::InvalidDate(format!("bad number '{raw}' for {group}")))
}

fn add_days(date: NaiveDate, days: i64) -> Result<NaiveDate, ParseFailure> {
    Duration::try_days(days)
        .and_then(|delta| date.checked_add_signed(delta))
        .ok_or_else(|| ParseFailure::OutOfRange(format!("{date} + {days} days")))
}
