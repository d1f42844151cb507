// 📅 Date Extractor - transaction date from the extract filename
// retail_<DD>_<MM>_<YYYY>.csv → YYYY-MM-DD

use crate::error::{EtlError, EtlResult};
use chrono::NaiveDate;

pub const FILE_PREFIX: &str = "retail_";
pub const FILE_SUFFIX: &str = ".csv";

/// Return the date of the transactions contained in `file_name`.
///
/// The name must be `retail_<DD>_<MM>_<YYYY>.csv` with three numeric tokens
/// forming a real calendar date.
///
/// # Examples:
/// ```
/// use retail_etl::extract_date_from_filename;
/// assert_eq!(extract_date_from_filename("retail_05_03_2024.csv").unwrap(), "2024-03-05");
/// ```
pub fn extract_date_from_filename(file_name: &str) -> EtlResult<String> {
    tracing::debug!("Start extract_date_from_filename: {}", file_name);

    let malformed = |reason: String| EtlError::MalformedFilename {
        file_name: file_name.to_string(),
        reason,
    };

    let stem = file_name
        .strip_prefix(FILE_PREFIX)
        .and_then(|rest| rest.strip_suffix(FILE_SUFFIX))
        .ok_or_else(|| malformed(format!("expected {FILE_PREFIX}<DD>_<MM>_<YYYY>{FILE_SUFFIX}")))?;

    let tokens: Vec<&str> = stem.split('_').collect();
    let [day, month, year] = tokens.as_slice() else {
        return Err(malformed(format!(
            "expected 3 date tokens, found {}",
            tokens.len()
        )));
    };

    let parse = |token: &str, part: &str| -> EtlResult<u32> {
        if token.is_empty() || !token.chars().all(|c| c.is_ascii_digit()) {
            return Err(malformed(format!("{part} '{token}' is not numeric")));
        }
        token
            .parse::<u32>()
            .map_err(|e| malformed(format!("{part} '{token}': {e}")))
    };

    let day = parse(*day, "day")?;
    let month = parse(*month, "month")?;
    let year = parse(*year, "year")?;

    let date = i32::try_from(year)
        .ok()
        .and_then(|y| NaiveDate::from_ymd_opt(y, month, day))
        .ok_or_else(|| malformed(format!("{year}-{month}-{day} is not a valid date")))?;

    Ok(date.format("%Y-%m-%d").to_string())
}
