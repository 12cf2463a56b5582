use chrono::NaiveDate;

/// Anything that can be resolved to a calendar day.
///
/// Lets horizon dates be given either as `NaiveDate` values or as `YYYY-MM-DD`
/// strings straight from the command line.
pub trait AnyDate {
    fn get_date(self) -> Option<NaiveDate>;
}

impl AnyDate for NaiveDate {
    fn get_date(self) -> Option<NaiveDate> {
        Some(self)
    }
}

impl AnyDate for &str {
    fn get_date(self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.trim(), "%Y-%m-%d").ok()
    }
}

impl AnyDate for String {
    fn get_date(self) -> Option<NaiveDate> {
        self.as_str().get_date()
    }
}

impl AnyDate for &String {
    fn get_date(self) -> Option<NaiveDate> {
        self.as_str().get_date()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iso_dates_only() {
        assert_eq!(
            "2018-05-01".get_date(),
            NaiveDate::from_ymd_opt(2018, 5, 1)
        );
        assert_eq!(" 2018-05-02 ".to_string().get_date(), NaiveDate::from_ymd_opt(2018, 5, 2));
        assert_eq!("01/05/2018".get_date(), None);
        assert_eq!("2018-02-30".get_date(), None);
    }
}
