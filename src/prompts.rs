//! Fixed instruction templates for the form-extraction routes.
//!
//! Each route sends its uploaded form with exactly one of these instructions.
//! They live here rather than in the handlers so tests can inspect them and
//! so changing a field list touches a single place.

/// Student enquiry form: fourteen handwritten fields, returned as JSON.
pub const ENQUIRY_FORM_PROMPT: &str = r#"Extract the handwritten values from the following fields in the student enquiry form:
1. Date
2. Time
3. Name of the Candidate
4. Father/Husband Name
5. Mother's Name
6. Aadhar No
7. Contact Number
8. Email Id
9. Gender
10. Date of Birth
11. Education Level
12. Contact Address
13. Pin Code
14. Purpose
Return the values in JSON format.
Here is an example of how the JSON output should look:
```json
{
"Date": "23/08/2024",
"Time": "11:53 AM",
"Name of the Candidate": "Example Name",
"Father/Husband Name": "Example Father's Name",
"Mother's Name": "Example Mother's Name",
"Aadhar No": "1234 5678 9012",
"Contact Number": "9876543210",
"Email Id": "example@example.com",
"Gender": "Female",
"Date of Birth": "01/01/2000",
"Education Level": "Degree",
"Address": "Example Address",
"Pin Code": "123456",
"purpose": "Admission"
}
```"#;

/// Meeting request slip: who, when, where, and why.
pub const SCHEDULE_MEETING_PROMPT: &str = r#"Extract the handwritten values from the following fields in the meeting scheduling form:
1. Meeting Title
2. Date
3. Start Time
4. End Time
5. Location
6. Organizer
7. Attendees
8. Agenda
Return the values in JSON format. List attendees as a JSON array of names.
Here is an example of how the JSON output should look:
```json
{
"Meeting Title": "Quarterly Review",
"Date": "23/08/2024",
"Start Time": "11:00 AM",
"End Time": "12:00 PM",
"Location": "Conference Room 2",
"Organizer": "Example Name",
"Attendees": ["Example Name", "Another Name"],
"Agenda": "Review of quarterly targets"
}
```"#;

/// Handwritten to-do list: one object per task.
pub const TODO_FORM_PROMPT: &str = r#"Extract every task from the handwritten to-do form.
For each task capture:
1. Task
2. Due Date
3. Priority
4. Status
Leave a field as an empty string when it is not written on the form.
Return the values in JSON format.
Here is an example of how the JSON output should look:
```json
{
"tasks": [
{"Task": "Submit fee receipt", "Due Date": "25/08/2024", "Priority": "High", "Status": "Pending"},
{"Task": "Collect ID card", "Due Date": "", "Priority": "Low", "Status": "Done"}
]
}
```"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_form_prompt_asks_for_json() {
        for prompt in [ENQUIRY_FORM_PROMPT, SCHEDULE_MEETING_PROMPT, TODO_FORM_PROMPT] {
            assert!(prompt.contains("JSON format"));
            assert!(prompt.trim_end().ends_with("```"));
        }
    }

    #[test]
    fn enquiry_prompt_lists_fourteen_fields() {
        assert!(ENQUIRY_FORM_PROMPT.contains("14. Purpose"));
        assert!(!ENQUIRY_FORM_PROMPT.contains("15."));
    }
}
