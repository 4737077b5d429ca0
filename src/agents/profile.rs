// Advisor personas used as the system prompt of each stage

use crate::agents::task::{render_template, TaskInputs};
use crate::types::AppResult;

#[derive(Debug, Clone)]
pub struct AdvisorProfile {
    pub role: &'static str,
    pub goal: &'static str,
    pub backstory: &'static str,
}

impl AdvisorProfile {
    pub fn agriculture_expert() -> Self {
        Self {
            role: "Agriculture Expert",
            goal: r#"You are an agriculture expert helping a farmer diagnose plant diseases.
You provide actionable insights based on plant disease knowledge and current weather conditions.

The disease is: {predicted_class}
The plant is: {name}
The farmer speaks: {language}

Current weather conditions:
- Temperature: {Temperature}
- Condition: {Condition}
- Humidity: {Humidity}
- Wind: {Wind}
- UV Index: {UV_index}

Provide a weather-aware prevention and treatment strategy in the requested language."#,
            backstory: "A farmer uploaded an image of a diseased plant. You use your knowledge of plant diseases and current weather to advise the farmer.",
        }
    }

    pub fn recovery_specialist() -> Self {
        Self {
            role: "Recovery Specialist",
            goal: "After prevention and treatment, suggest fertilizers and nutrients to help the plant recover.",
            backstory: "An expert in plant nutrition helping farmers after disease control.",
        }
    }

    pub fn system_prompt(&self, inputs: &TaskInputs) -> AppResult<String> {
        let goal = render_template(self.goal, inputs)?;
        Ok(format!(
            "You are {role}. {backstory}\nYour personal goal is: {goal}",
            role = self.role,
            backstory = self.backstory,
            goal = goal,
        ))
    }
}
