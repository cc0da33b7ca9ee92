use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub id: String,
    pub date: String,
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    pub is_booked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booked_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_phone: Option<String>,
    pub is_active: bool,
}

impl TimeSlot {
    pub fn open(id: &str, date: &str, start_time: &str, end_time: &str) -> Self {
        Self {
            id: id.into(),
            date: date.into(),
            start_time: start_time.into(),
            end_time: end_time.into(),
            is_booked: false,
            booked_by: None,
            candidate_email: None,
            candidate_phone: None,
            is_active: true,
        }
    }

    /// A booked slot has to name who booked it and how to reach them.
    pub fn is_consistent(&self) -> bool {
        if !self.is_booked {
            return true;
        }
        let present = |field: &Option<String>| field.as_deref().is_some_and(|v| !v.is_empty());
        present(&self.booked_by) && present(&self.candidate_email)
    }

    pub fn book(&mut self, details: &BookingDetails) {
        self.is_booked = true;
        self.booked_by = Some(details.candidate_name.clone());
        self.candidate_email = Some(details.email.clone());
        self.candidate_phone = Some(details.phone_number.clone());
    }

    /// The slot as candidates get to see it, without anyone's contact details.
    pub fn without_booker(self) -> Self {
        Self {
            booked_by: None,
            candidate_email: None,
            candidate_phone: None,
            ..self
        }
    }

    /// Sample collection used whenever nothing valid is stored yet.
    pub fn examples() -> Vec<TimeSlot> {
        vec![
            TimeSlot::open("1", "2024-12-20", "10:00", "11:00"),
            TimeSlot::open("2", "2024-12-20", "14:00", "15:00"),
            TimeSlot::open("3", "2024-12-21", "11:00", "12:00"),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInfo {
    pub name: String,
    pub job_title: String,
    pub description: String,
    pub guidelines: Vec<String>,
}

impl Default for CompanyInfo {
    fn default() -> Self {
        Self {
            name: "Mirae Technology".into(),
            job_title: "Frontend Developer".into(),
            description: "We are looking for people to build innovative services with us.".into(),
            guidelines: vec![
                "Please join five minutes before the interview starts.".into(),
                "Check your camera and microphone in advance.".into(),
                "Join from a quiet place.".into(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetails {
    #[validate(length(min = 1))]
    pub candidate_name: String,
    #[validate(email)]
    pub email: String,
    pub phone_number: String,
    #[validate(length(min = 1))]
    pub slot_id: String,
}
