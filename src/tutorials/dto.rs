use serde::{Deserialize, Serialize};

use super::repo_types::{NewTutorial, TutorialPatch};
use crate::error::{AppError, AppResult};

const MAX_SHORT_FIELD: usize = 64;
const MAX_DESCRIPTION: usize = 165;

fn required(field: &str, value: &str, max: usize) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    if value.chars().count() > max {
        return Err(AppError::validation(format!(
            "{field} should be at most {max} characters"
        )));
    }
    Ok(value.to_string())
}

fn positive_hours(hours: i32) -> AppResult<i32> {
    if hours <= 0 {
        return Err(AppError::validation("Hours to learn should be positive"));
    }
    Ok(hours)
}

fn clean_summary(summary: Vec<String>) -> Vec<String> {
    summary
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct CreateTutorialRequest {
    pub slug: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub summary: Vec<String>,
    pub content: String,
    pub technology: String,
    #[serde(alias = "hoursToLearn")]
    pub hours_to_learn: i32,
    #[serde(default, alias = "isPremium")]
    pub is_premium: bool,
}

impl CreateTutorialRequest {
    pub fn validate(self) -> AppResult<NewTutorial> {
        let content = self.content.trim();
        if content.is_empty() {
            return Err(AppError::validation("Content is required"));
        }
        Ok(NewTutorial {
            slug: required("Slug", &self.slug, MAX_SHORT_FIELD)?,
            title: required("Title", &self.title, MAX_SHORT_FIELD)?,
            description: required("Description", &self.description, MAX_DESCRIPTION)?,
            summary: clean_summary(self.summary),
            content: content.to_string(),
            technology: required("Technology", &self.technology, MAX_SHORT_FIELD)?,
            hours_to_learn: positive_hours(self.hours_to_learn)?,
            is_premium: self.is_premium,
        })
    }
}

/// Only the fields present in the body are changed.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTutorialRequest {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub summary: Option<Vec<String>>,
    pub content: Option<String>,
    pub technology: Option<String>,
    #[serde(alias = "hoursToLearn")]
    pub hours_to_learn: Option<i32>,
    #[serde(alias = "isPremium")]
    pub is_premium: Option<bool>,
}

impl UpdateTutorialRequest {
    pub fn validate(self) -> AppResult<TutorialPatch> {
        let content = match self.content {
            Some(c) if c.trim().is_empty() => {
                return Err(AppError::validation("Content is required"))
            }
            Some(c) => Some(c.trim().to_string()),
            None => None,
        };
        Ok(TutorialPatch {
            slug: self
                .slug
                .map(|v| required("Slug", &v, MAX_SHORT_FIELD))
                .transpose()?,
            title: self
                .title
                .map(|v| required("Title", &v, MAX_SHORT_FIELD))
                .transpose()?,
            description: self
                .description
                .map(|v| required("Description", &v, MAX_DESCRIPTION))
                .transpose()?,
            summary: self.summary.map(clean_summary),
            content,
            technology: self
                .technology
                .map(|v| required("Technology", &v, MAX_SHORT_FIELD))
                .transpose()?,
            hours_to_learn: self.hours_to_learn.map(positive_hours).transpose()?,
            is_premium: self.is_premium,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CompletedResponse {
    pub completed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_accepts_camel_case_and_defaults() {
        let req: CreateTutorialRequest = serde_json::from_value(json!({
            "slug": " go-101 ",
            "title": "Go Basics",
            "description": "Start with Go",
            "content": "package main",
            "technology": "Go",
            "hoursToLearn": 10
        }))
        .unwrap();
        let t = req.validate().unwrap();
        assert_eq!(t.slug, "go-101");
        assert_eq!(t.hours_to_learn, 10);
        assert!(!t.is_premium);
        assert!(t.summary.is_empty());
    }

    #[test]
    fn create_rejects_bad_fields() {
        let base = json!({
            "slug": "go-101",
            "title": "Go Basics",
            "description": "Start with Go",
            "content": "package main",
            "technology": "Go",
            "hours_to_learn": 10
        });

        let mut zero_hours = base.clone();
        zero_hours["hours_to_learn"] = json!(0);
        let mut long_description = base.clone();
        long_description["description"] = json!("d".repeat(166));
        let mut blank_title = base.clone();
        blank_title["title"] = json!("   ");

        for body in [zero_hours, long_description, blank_title] {
            let req: CreateTutorialRequest = serde_json::from_value(body).unwrap();
            assert!(matches!(req.validate(), Err(AppError::Validation(_))));
        }
    }

    #[test]
    fn update_validates_only_present_fields() {
        let patch = UpdateTutorialRequest {
            title: Some(" Go Deep Dive ".into()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(patch.title.as_deref(), Some("Go Deep Dive"));
        assert!(patch.slug.is_none());

        let bad = UpdateTutorialRequest {
            hours_to_learn: Some(-1),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
