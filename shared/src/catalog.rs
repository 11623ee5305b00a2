//! Built-in clinical reference data: drug interactions, condition summaries,
//! medication facts and a cardiovascular risk score.
//!
//! The dashboard reaches this data through [`ClinicalCatalog`] so a real
//! reference service can replace [`StaticCatalog`] without touching the app.

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Minor,
    Moderate,
    Major,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugInteraction {
    pub drug1: String,
    pub drug2: String,
    pub severity: Severity,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalCondition {
    pub name: String,
    pub description: String,
    pub symptoms: Vec<String>,
    pub treatments: Vec<String>,
    pub prevalence: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationInfo {
    pub name: String,
    pub generic_name: String,
    pub brand_names: Vec<String>,
    pub purpose: String,
    pub common_side_effects: Vec<String>,
    pub serious_side_effects: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskFactors {
    pub age: u32,
    pub systolic: u32,
    pub diastolic: u32,
    pub cholesterol: u32,
    pub bmi: f64,
    pub smoker: bool,
    pub diabetic: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn from_score(score: u32) -> Self {
        match score {
            0..=19 => RiskLevel::Low,
            20..=49 => RiskLevel::Moderate,
            _ => RiskLevel::High,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: u32,
    pub risk: RiskLevel,
    pub recommendations: Vec<String>,
}

pub trait ClinicalCatalog: Send + Sync {
    /// Known interactions between any two of `medications`, in pair order.
    fn drug_interactions(&self, medications: &[String]) -> Vec<DrugInteraction>;

    fn find_condition(&self, name: &str) -> Option<MedicalCondition>;

    fn medication_info(&self, name: &str) -> Option<MedicationInfo>;

    fn assess_risk(&self, factors: &RiskFactors) -> RiskAssessment;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StaticCatalog;

impl ClinicalCatalog for StaticCatalog {
    fn drug_interactions(&self, medications: &[String]) -> Vec<DrugInteraction> {
        let names: Vec<String> = medications.iter().map(|m| m.trim().to_lowercase()).collect();
        let mut found = Vec::new();
        for (i, first) in names.iter().enumerate() {
            for second in &names[i + 1..] {
                if let Some(hit) = interaction(first, second).or_else(|| interaction(second, first)) {
                    found.push(hit);
                }
            }
        }
        debug!(checked = names.len(), found = found.len(), "interaction check");
        found
    }

    fn find_condition(&self, name: &str) -> Option<MedicalCondition> {
        let condition = match name.trim().to_lowercase().as_str() {
            "hypertension" => condition(
                "Hypertension (High Blood Pressure)",
                "A condition in which the force of blood against artery walls is too high.",
                &["Headaches", "Shortness of breath", "Nosebleeds", "Often asymptomatic"],
                &[
                    "Lifestyle modifications (diet, exercise)",
                    "ACE inhibitors",
                    "Diuretics",
                    "Beta blockers",
                ],
                "Affects approximately 1 in 3 adults in the US",
            ),
            "diabetes" => condition(
                "Diabetes Mellitus Type 2",
                "A chronic condition affecting how the body processes blood sugar (glucose).",
                &[
                    "Increased thirst",
                    "Frequent urination",
                    "Increased hunger",
                    "Fatigue",
                    "Blurred vision",
                    "Slow-healing sores",
                ],
                &[
                    "Metformin",
                    "Insulin therapy",
                    "Diet and exercise",
                    "Blood sugar monitoring",
                ],
                "Affects over 37 million Americans",
            ),
            "asthma" => condition(
                "Asthma",
                "A chronic respiratory condition characterized by inflammation and narrowing of airways.",
                &["Shortness of breath", "Chest tightness", "Wheezing", "Coughing"],
                &[
                    "Inhaled corticosteroids",
                    "Bronchodilators",
                    "Avoiding triggers",
                    "Action plan management",
                ],
                "Affects approximately 1 in 13 people",
            ),
            _ => return None,
        };
        Some(condition)
    }

    fn medication_info(&self, name: &str) -> Option<MedicationInfo> {
        let info = match name.trim().to_lowercase().as_str() {
            "metformin" => MedicationInfo {
                name: "Metformin".into(),
                generic_name: "Metformin Hydrochloride".into(),
                brand_names: strings(&["Glucophage", "Fortamet", "Riomet"]),
                purpose: "Used to treat type 2 diabetes by lowering blood sugar levels".into(),
                common_side_effects: strings(&[
                    "Nausea",
                    "Diarrhea",
                    "Stomach upset",
                    "Metallic taste",
                ]),
                serious_side_effects: strings(&[
                    "Lactic acidosis (rare but serious)",
                    "Vitamin B12 deficiency",
                    "Hypoglycemia when combined with other medications",
                ]),
                warnings: strings(&[
                    "Avoid excessive alcohol consumption",
                    "Inform doctor before surgery or imaging tests",
                    "Monitor kidney function regularly",
                ]),
            },
            "lisinopril" => MedicationInfo {
                name: "Lisinopril".into(),
                generic_name: "Lisinopril".into(),
                brand_names: strings(&["Zestril", "Prinivil", "Qbrelis"]),
                purpose: "ACE inhibitor used to treat high blood pressure and heart failure"
                    .into(),
                common_side_effects: strings(&["Dry cough", "Dizziness", "Headache", "Fatigue"]),
                serious_side_effects: strings(&[
                    "Angioedema (swelling)",
                    "Hyperkalemia (high potassium)",
                    "Kidney problems",
                    "Severe hypotension",
                ]),
                warnings: strings(&[
                    "Do not use during pregnancy",
                    "Monitor potassium levels",
                    "Can cause dizziness when standing up quickly",
                ]),
            },
            _ => return None,
        };
        Some(info)
    }

    fn assess_risk(&self, factors: &RiskFactors) -> RiskAssessment {
        let mut score = 0;
        let mut recommendations = Vec::new();

        if factors.age > 65 {
            score += 20;
        } else if factors.age > 45 {
            score += 10;
        }

        let mut flag = |hit: bool, points: u32, advice: &str| {
            if hit {
                score += points;
                recommendations.push(advice.to_string());
            }
        };
        flag(
            factors.systolic > 140 || factors.diastolic > 90,
            15,
            "Monitor blood pressure regularly and consider lifestyle modifications",
        );
        flag(
            factors.cholesterol > 240,
            15,
            "Reduce dietary cholesterol and increase physical activity",
        );
        flag(
            factors.bmi > 30.0,
            10,
            "Work towards a healthy weight through diet and exercise",
        );
        flag(
            factors.smoker,
            20,
            "Quit smoking - it significantly increases cardiovascular risk",
        );
        flag(
            factors.diabetic,
            15,
            "Maintain tight blood sugar control through medication and lifestyle",
        );

        if recommendations.is_empty() {
            recommendations.push("Maintain your current healthy lifestyle".to_string());
        }

        RiskAssessment {
            score,
            risk: RiskLevel::from_score(score),
            recommendations,
        }
    }
}

// Keyed by lowercase names; callers try both orders.
fn interaction(first: &str, second: &str) -> Option<DrugInteraction> {
    let (drug1, drug2, severity, description) = match (first, second) {
        ("aspirin", "warfarin") => (
            "Aspirin",
            "Warfarin",
            Severity::Major,
            "Increased risk of bleeding. Both medications thin the blood and can cause serious bleeding complications when taken together.",
        ),
        ("aspirin", "ibuprofen") => (
            "Aspirin",
            "Ibuprofen",
            Severity::Moderate,
            "Reduced effectiveness of aspirin. Ibuprofen may interfere with the cardioprotective effects of aspirin.",
        ),
        ("metformin", "alcohol") => (
            "Metformin",
            "Alcohol",
            Severity::Moderate,
            "Increased risk of lactic acidosis. Excessive alcohol consumption can increase the risk of this serious side effect.",
        ),
        _ => return None,
    };
    Some(DrugInteraction {
        drug1: drug1.into(),
        drug2: drug2.into(),
        severity,
        description: description.into(),
    })
}

fn condition(
    name: &str,
    description: &str,
    symptoms: &[&str],
    treatments: &[&str],
    prevalence: &str,
) -> MedicalCondition {
    MedicalCondition {
        name: name.into(),
        description: description.into(),
        symptoms: strings(symptoms),
        treatments: strings(treatments),
        prevalence: prevalence.into(),
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}
