//! Derivation prompt assembly.
//!
//! The prompt embeds the transcript, the summary, participant identities,
//! and the names of existing CRM records so the model references real
//! entities instead of inventing duplicates.

use conclave_core::domain::crm::CrmSnapshot;
use conclave_core::domain::session::{AgentProfile, Session, TranscriptMessage};

const RESPONSE_SHAPE: &str = r#"Respond with a single JSON object of this shape and nothing else:
{
  "items": [
    {
      "id": "<short stable id, unique in this list>",
      "type": "mission | follow_up | document | crm | event | quote | project",
      "data": { ... type-specific fields ... },
      "source_excerpt": "<verbatim quote from the transcript justifying this item>"
    }
  ]
}
Propose only actions the discussion actually concluded. Reference existing
companies and contacts by their listed names rather than creating new ones."#;

pub fn build_derivation_prompt(
    session: &Session,
    transcript: &[TranscriptMessage],
    summary: &str,
    profiles: &[AgentProfile],
    snapshot: &CrmSnapshot,
) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "A decision session titled \"{}\" has just closed. Derive the concrete \
         follow-up actions its participants agreed on.\n\n",
        session.title
    ));

    prompt.push_str("Participants:\n");
    for profile in profiles {
        prompt.push_str(&format!("- {} ({})\n", profile.display_name, profile.id));
    }

    prompt.push_str("\nSummary:\n");
    prompt.push_str(summary.trim());
    prompt.push('\n');

    prompt.push_str("\nTranscript:\n");
    for message in transcript {
        let speaker = profiles
            .iter()
            .find(|profile| profile.id == message.agent_id)
            .map(|profile| profile.display_name.as_str())
            .unwrap_or(message.agent_id.as_str());
        prompt.push_str(&format!("{speaker}: {}\n", message.content));
    }

    if !snapshot.companies.is_empty() {
        prompt.push_str("\nExisting companies:\n");
        for company in &snapshot.companies {
            prompt.push_str(&format!("- {}\n", company.name));
        }
    }
    if !snapshot.contacts.is_empty() {
        prompt.push_str("\nExisting contacts:\n");
        for contact in &snapshot.contacts {
            prompt.push_str(&format!("- {}\n", contact.display_name()));
        }
    }

    prompt.push('\n');
    prompt.push_str(RESPONSE_SHAPE);
    prompt
}
