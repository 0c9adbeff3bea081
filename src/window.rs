//! Report date-window selection.
//!
//! The window is either the current work week (most recent Monday through
//! today) or two explicit `YYMMDD` dates. Interactive entry re-prompts on
//! bad input instead of failing.

use anyhow::{anyhow, bail, Result};
use chrono::{Datelike, Duration, NaiveDate};
use std::io::{BufRead, Write};

/// Date format used on the command line, in prompts, and in file names.
pub const YYMMDD: &str = "%y%m%d";

/// Inclusive range of calendar days covered by a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// True when `day` falls inside the window, both ends included.
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Start and end rendered as `YYMMDD`.
    pub fn label(&self) -> (String, String) {
        (
            self.start.format(YYMMDD).to_string(),
            self.end.format(YYMMDD).to_string(),
        )
    }

    /// Days between the window start and `today`, never negative.
    pub fn days_since_start(&self, today: NaiveDate) -> u64 {
        (today - self.start).num_days().max(0) as u64
    }
}

/// The current work week: the most recent Monday (today, if it is one) through today.
pub fn default_range(today: NaiveDate) -> DateRange {
    let back = today.weekday().num_days_from_monday() as i64;
    DateRange::new(today - Duration::days(back), today)
}

/// Parse a strict six-digit `YYMMDD` date.
pub fn parse_yymmdd(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_digit()) {
        bail!("date should be YYMMDD, got {:?}", s);
    }
    NaiveDate::parse_from_str(s, YYMMDD).map_err(|_| anyhow!("{:?} is not a calendar date", s))
}

/// Ask a question until the answer is one of `valid`.
pub fn validated_input<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
    retry: &str,
    valid: &[&str],
) -> Result<String> {
    loop {
        let answer = read_answer(input, output, prompt)?;
        if valid.contains(&answer.as_str()) {
            return Ok(answer);
        }
        writeln!(output, "{}", retry)?;
    }
}

/// Ask for a `YYMMDD` date until a valid one is entered.
pub fn validated_date_input<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
    retry: &str,
) -> Result<NaiveDate> {
    loop {
        let answer = read_answer(input, output, prompt)?;
        match parse_yymmdd(&answer) {
            Ok(day) => return Ok(day),
            Err(_) => writeln!(output, "{}", retry)?,
        }
    }
}

/// Interactively confirm the default window or collect an explicit one.
pub fn prompt_range<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    today: NaiveDate,
) -> Result<DateRange> {
    let default = default_range(today);
    let (start, end) = default.label();

    let question = format!(
        "\nWould you like to report on samples collected between {} and {}? (y / n): ",
        start, end
    );
    let answer = validated_input(input, output, &question, "\nPlease try again...", &["y", "n"])?;
    if answer == "y" {
        return Ok(default);
    }

    let retry = "\nPlease try again... date should be YYMMDD";
    loop {
        let start = validated_date_input(
            input,
            output,
            "Please enter report start date (YYMMDD): ",
            retry,
        )?;
        let end = validated_date_input(input, output, "Please enter report end date (YYMMDD): ", retry)?;
        if start <= end {
            return Ok(DateRange::new(start, end));
        }
        writeln!(output, "\nStart date must not be after end date. Please try again...")?;
    }
}

fn read_answer<R: BufRead, W: Write>(input: &mut R, output: &mut W, prompt: &str) -> Result<String> {
    write!(output, "{}", prompt)?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        bail!("input closed while waiting for an answer");
    }
    Ok(line.trim().to_string())
}
