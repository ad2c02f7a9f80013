use crate::models::{AlbumRating, UserGoals};

const PERSONA: &str = "You are Boomie, an expert music recommendation agent.";

const RULES: [&str; 7] = [
    "Recommend only one album.",
    "Do not recommend an album that already appears in the user's history.",
    "Return mainstream and searchable album/artist names so a Spotify search can find them reliably.",
    "Use search_spotify_albums to confirm the album exists on Spotify and include its id as spotifyAlbumId.",
    "Write `albumDescription` as 2-3 sentences.",
    "Write `whyForUser` as exactly 1 sentence.",
    "Keep language concise and specific.",
];

pub const COLD_START_INSTRUCTION: &str = "The user has no prior album ratings yet. Treat this as a cold start and make a strong starter recommendation using any available user goals and notes.";

pub const SUBMIT_NUDGE: &str =
    "Respond by calling submit_recommendation with your final recommendation.";

pub fn steering_instruction(steering: &str) -> String {
    format!(
        "Use this optional preference for the next pick only: {}",
        steering
    )
}

pub fn rejected_instruction(album: &str, artist: &str, reason: &str) -> String {
    format!(
        "Do not recommend \"{}\" by {}: {}. Pick a different album.",
        album, artist, reason
    )
}

fn history_section(history: &[AlbumRating]) -> String {
    if history.is_empty() {
        return "(no ratings yet)".to_string();
    }

    history
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let notes = entry.notes.trim();
            let notes = if notes.is_empty() { "(none)" } else { notes };
            format!(
                "{}. Album: {}\nRating: {}\nNotes: {}",
                index + 1,
                entry.album_name,
                entry.rating,
                notes
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn goals_section(goals: &UserGoals) -> Vec<String> {
    let mut lines = vec!["User goals:".to_string()];
    lines.extend(goals.selected_goals.iter().map(|g| format!("- {}", g.label())));
    if !goals.notes.trim().is_empty() {
        lines.push(format!("Goal notes: {}", goals.notes.trim()));
    }
    lines.push(String::new());
    lines
}

/// Builds the single user prompt that opens a generation conversation
pub fn build_prompt(
    history: &[AlbumRating],
    goals: Option<&UserGoals>,
    extra_instructions: &[String],
) -> String {
    let mut lines = vec![
        PERSONA.to_string(),
        "Pick one album recommendation based on the user's album rating history.".to_string(),
        "Recommendation rules:".to_string(),
    ];
    lines.extend(RULES.iter().map(|rule| format!("- {}", rule)));
    lines.extend(extra_instructions.iter().map(|i| format!("- {}", i)));
    lines.push(String::new());

    if let Some(goals) = goals {
        lines.extend(goals_section(goals));
    }

    lines.push("User rating history:".to_string());
    lines.push(history_section(history));

    lines.join("\n")
}
