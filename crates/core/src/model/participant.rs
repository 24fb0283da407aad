use serde::{Deserialize, Serialize};

/// Identity captured by the registration form.
///
/// Opaque to the session: it is only carried through to the stored result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub name: String,
    pub email: String,
    pub prn: String,
    pub year: Option<String>,
    pub division: Option<String>,
    pub batch: Option<String>,
    pub quiz_code: String,
}

impl Participant {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        prn: impl Into<String>,
        quiz_code: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            prn: prn.into(),
            quiz_code: quiz_code.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_year(mut self, year: impl Into<String>) -> Self {
        self.year = Some(year.into());
        self
    }

    #[must_use]
    pub fn with_division(mut self, division: impl Into<String>) -> Self {
        self.division = Some(division.into());
        self
    }

    #[must_use]
    pub fn with_batch(mut self, batch: impl Into<String>) -> Self {
        self.batch = Some(batch.into());
        self
    }
}
