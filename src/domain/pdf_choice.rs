const MAX_CHAR_LENGTH: usize = 64;

/// A downloadable resource offered by the capture forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resource {
    pub title: &'static str,
    pub file_name: &'static str,
}

pub const BUSINESS_AUTOMATION_PLAYBOOK: Resource = Resource {
    title: "Business Automation Playbook",
    file_name: "business-automation-playbook.pdf",
};

pub const AI_TRENDS_REPORT: Resource = Resource {
    title: "AI Trends Report 2024",
    file_name: "ai-trends-report-2026.pdf",
};

pub const AI_EDUCATION_GUIDE: Resource = Resource {
    title: "AI Education Guide",
    file_name: "ai-education-guide.pdf",
};

const ALL_RESOURCES: [Resource; 3] = [
    BUSINESS_AUTOMATION_PLAYBOOK,
    AI_TRENDS_REPORT,
    AI_EDUCATION_GUIDE,
];

/// Which resource bundle the subscriber asked for on the form.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfChoice(String);

impl PdfChoice {
    pub fn parse(choice: String) -> Result<PdfChoice, String> {
        let choice = choice.trim().to_string();

        if choice.is_empty() {
            return Err(String::from("Please select which PDF you want"));
        }
        if choice.chars().count() > MAX_CHAR_LENGTH {
            return Err(format!("{} is not a valid PDF choice", choice));
        }

        Ok(Self(choice))
    }
}

impl AsRef<str> for PdfChoice {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Unknown choices (including `all`) fall back to the full bundle.
pub fn resources_for(choice: &str) -> Vec<Resource> {
    match choice {
        "business" => vec![BUSINESS_AUTOMATION_PLAYBOOK],
        "trends" => vec![AI_TRENDS_REPORT],
        "education" => vec![AI_EDUCATION_GUIDE],
        _ => ALL_RESOURCES.to_vec(),
    }
}
