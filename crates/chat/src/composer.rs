//! Prompt composition.
//!
//! Builds the ordered message sequence sent to the completion provider:
//! `[system, ...history (role and content only), new user message]`. The
//! system message is a fixed instruction template with the sensor digest
//! interpolated as free text. Composition is deterministic — same inputs,
//! same prompt — and applies no truncation of its own; the history window
//! is already capped by the loader.

use agrisense_core::{ChatMessage, SensorReading, StoredMessage};

/// Marker substituted when the sensor store is empty or unreadable.
/// The template section is never silently omitted.
pub const NO_SENSOR_DATA: &str = "(No sensor data provided)";

/// Render the sensor digest: one block per reading, every recognized metric
/// listed with its human-readable label.
pub fn sensor_digest(readings: &[SensorReading]) -> String {
    readings
        .iter()
        .enumerate()
        .map(|(index, reading)| {
            let metrics = reading
                .metrics()
                .iter()
                .map(|(label, value)| format!("- **{label}:** {value}"))
                .collect::<Vec<_>>()
                .join("\n");
            format!(
                "Sensor Record #{}:\n{}\n-----------------------------",
                index + 1,
                metrics
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The fixed instruction template with the digest interpolated.
pub fn system_instructions(digest: &str) -> String {
    let sensor_section = if digest.is_empty() {
        NO_SENSOR_DATA
    } else {
        digest
    };

    format!(
        r#"You are the AgriSense assistant, an expert agronomist and sensor analyst. Your task is to analyze the provided sensor data and deliver clear, professional, and structured Markdown responses that help the farmer understand the current state of the soil and environment.

When responding, always include:

---

### Sensor Data Summary
- Analyze **soil humidity** to assess soil moisture conditions (e.g., dry, optimal, saturated).
- Evaluate other sensors (temperature, humidity, water level, steam, light) and explain their impact on soil and crop health.
- Identify any abnormalities or important trends in the data.

### Soil and Crop Health Analysis
- Based on the sensor readings, provide a detailed analysis of soil condition.
- Recommend suitable farming actions or types of crops best suited for the current conditions (e.g., drought-resistant, moisture-loving).
- Suggest irrigation or environmental adjustments if necessary.

### Key Insights and Recommendations
- Bullet-point practical advice for the farmer to improve soil health or respond to sensor conditions.
- Warn about any risks or urgent issues detected by sensor data.

---

### Raw Sensor Data (for reference):

{sensor_section}

---

Your answers should be concise, actionable, and use Markdown formatting with headings, lists, and emphasis to enhance clarity.

### Image Instructions (Critical)

If the user **asks you to generate or provide an image**, do the following:

1. **Search for a real image** matching the user's description on free, reputable image sources like Freepik, Unsplash, or Pexels.
2. **Do NOT generate AI-synthesized images or placeholders.**
3. Return the image as a full HTML <img> tag **with valid image URL ending in .jpg, .png, or .jpeg, etc.**
4. The HTML tag **must be exactly like this, with no code block or backticks**:

<img src="ACTUAL_IMAGE_URL" alt="Concise descriptive alt text" style="max-width: 100%; height: auto;" />

5. **Replace ACTUAL_IMAGE_URL and alt text appropriately for the image.**

6. **Do NOT return only the URL or markdown image syntax!**

7. Ensure the image is relevant and visually clear for the description.

---

### Example:

User prompt: "Generate an image of a man drinking medicine."

You respond with:

<img src="https://img.freepik.com/free-photo/sick-man-with-cold-drinking-medicine-tablets_23-2148440306.jpg" alt="Man drinking medicine" style="max-width: 100%; height: auto;" />

---

Keep your language concise, formal, and informative. Avoid verbosity and repetition.
"#
    )
}

/// Assemble the full prompt for one request.
pub fn compose(
    readings: &[SensorReading],
    history: &[StoredMessage],
    user_message: &str,
) -> Vec<ChatMessage> {
    let digest = sensor_digest(readings);

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(system_instructions(&digest)));
    messages.extend(history.iter().map(ChatMessage::from));
    messages.push(ChatMessage::user(user_message));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use agrisense_core::Role;

    fn reading(temperature: &str) -> SensorReading {
        SensorReading::new(temperature, "60", "mid", "0", "300", "45")
    }

    #[test]
    fn digest_lists_every_metric_with_label() {
        let digest = sensor_digest(&[reading("25")]);
        assert!(digest.starts_with("Sensor Record #1:"));
        assert!(digest.contains("- **Temperature:** 25"));
        assert!(digest.contains("- **Humidity:** 60"));
        assert!(digest.contains("- **WaterLevel:** mid"));
        assert!(digest.contains("- **Steam:** 0"));
        assert!(digest.contains("- **Light:** 300"));
        assert!(digest.contains("- **SoilHumidity:** 45"));
    }

    #[test]
    fn digest_numbers_records_in_order() {
        let digest = sensor_digest(&[reading("20"), reading("21"), reading("22")]);
        assert!(digest.contains("Sensor Record #1:"));
        assert!(digest.contains("Sensor Record #2:"));
        assert!(digest.contains("Sensor Record #3:"));
        let first = digest.find("#1").unwrap();
        let third = digest.find("#3").unwrap();
        assert!(first < third);
    }

    #[test]
    fn empty_store_gets_the_fixed_marker() {
        let system = system_instructions(&sensor_digest(&[]));
        assert!(system.contains(NO_SENSOR_DATA));
    }

    #[test]
    fn instructions_always_carry_the_image_contract() {
        let system = system_instructions("");
        assert!(system.contains("<img src=\"ACTUAL_IMAGE_URL\""));
        assert!(system.contains("Do NOT return only the URL or markdown image syntax!"));
    }

    #[test]
    fn compose_puts_exactly_one_system_message_first() {
        let history = vec![
            StoredMessage::new("c1", Role::User, "earlier question"),
            StoredMessage::new("c1", Role::Assistant, "earlier answer"),
        ];
        let messages = compose(&[reading("25")], &history, "what now?");

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, "system");
        assert_eq!(
            messages.iter().filter(|m| m.role == "system").count(),
            1
        );
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[1].content, "earlier question");
        assert_eq!(messages[2].role, "assistant");
        assert_eq!(messages.last().unwrap().role, "user");
        assert_eq!(messages.last().unwrap().content, "what now?");
    }

    #[test]
    fn compose_with_no_context_still_has_system_then_user() {
        let messages = compose(&[], &[], "hello");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert!(messages[0].content.contains(NO_SENSOR_DATA));
        assert_eq!(messages[1].content, "hello");
    }

    #[test]
    fn digest_is_embedded_verbatim() {
        let readings = [reading("25.5")];
        let system = system_instructions(&sensor_digest(&readings));
        assert!(system.contains("- **Temperature:** 25.5"));
        assert!(!system.contains(NO_SENSOR_DATA));
    }

    #[test]
    fn compose_is_deterministic() {
        let readings = [reading("25")];
        let history = vec![StoredMessage::new("c1", Role::User, "q")];
        let a = compose(&readings, &history, "again");
        let b = compose(&readings, &history, "again");
        assert_eq!(a, b);
    }
}
