use serde::de::DeserializeOwned;
use std::io::{self, Read};

/// Deserialize a piped input record for `what` (e.g. "stamp-duty").
///
/// Returns `None` when stdin is a terminal or the pipe carries nothing, so
/// callers can fall back to flags.
pub fn read_piped<T: DeserializeOwned>(what: &str) -> Result<Option<T>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    parse_piped(&buffer, what)
}

fn parse_piped<T: DeserializeOwned>(
    raw: &str,
    what: &str,
) -> Result<Option<T>, Box<dyn std::error::Error>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|e| format!("stdin is not a valid {what} record: {e}").into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use property_finance_core::amortization::LoanParameters;

    #[test]
    fn test_blank_pipe_falls_back_to_flags() {
        let parsed: Option<LoanParameters> = parse_piped("  \n", "mortgage").unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn test_piped_record_is_typed() {
        let raw = r#"{"principal": "500000", "annual_rate": "0.035", "tenure_years": 25}"#;
        let loan: LoanParameters = parse_piped(raw, "mortgage").unwrap().unwrap();
        assert_eq!(loan.tenure_years, 25);
    }

    #[test]
    fn test_malformed_record_names_the_command() {
        let err = parse_piped::<LoanParameters>("{\"principal\": 1", "mortgage").unwrap_err();
        assert!(err.to_string().contains("mortgage record"));
    }
}
