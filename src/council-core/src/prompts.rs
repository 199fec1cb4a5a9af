//! Instruction text for every cue the phase machine can issue.

use crate::phase::Cue;

/// Instruction for `cue`.
///
/// `topic` and `speaker` are substituted where the wording needs them;
/// `other_names` is the comma-separated list of the speaker's opponents.
pub fn instruction(cue: Cue, topic: &str, speaker: &str, other_names: &str) -> String {
    match cue {
        Cue::ModeratorIntroduction => format!(
            "Briefly introduce this debate on '{topic}' and invite the first speaker to give \
             their opening statement. Be concise (2-3 sentences)."
        ),
        Cue::OpeningStatement => format!(
            r#"Give your opening statement on: {topic}

In 2-3 paragraphs:
1. State your core position clearly
2. Present your main arguments
3. If you're not the first speaker, briefly acknowledge what others have said

Be direct and substantive."#
        ),
        Cue::ModeratorChallenge => r#"Based on the opening statements, identify the key points of disagreement.
Then pose a direct question to one debater about another's argument.
Format: "[Debater A], [Debater B] argued [X]. How do you respond to this?"
Be specific and pointed."#
            .to_string(),
        Cue::CrossExamination => format!(
            r#"The moderator or another debater has raised points you should address.

Your task:
1. Directly respond to any challenges to your position
2. Then pose a pointed question to one of the other debaters ({other_names})
3. Your question should challenge their argument or expose a weakness in their reasoning

Be direct. This is cross-examination - be intellectually aggressive but respectful."#
        ),
        Cue::ModeratorIntervention => r#"The cross-examination continues.
Identify an argument that hasn't been adequately addressed or a contradiction that should be explored.
Push one of the debaters to clarify or defend their position. Be specific and probing."#
            .to_string(),
        Cue::ModeratorFraming => r#"Summarize the key points of contention that have emerged.
Then invite the debaters to give their rebuttals, focusing on the strongest challenges to their positions."#
            .to_string(),
        Cue::Rebuttal => r#"Give your rebuttal.

In 2-3 paragraphs:
1. Address the strongest challenge that was raised against your position
2. Reinforce your argument with additional reasoning or examples
3. Point out any weaknesses in the other positions that haven't been addressed

This is your chance to defend your view and strengthen your case."#
            .to_string(),
        Cue::ModeratorOpenFloor => r#"We now move to open debate.
Identify the most important unresolved question and direct it to the debater best positioned to address it."#
            .to_string(),
        Cue::FreeExchange => r#"Respond to the moderator's question or the previous speaker's point.
Be concise but substantive. Then either:
- Pose a follow-up question to another debater, OR
- Make a new argument that advances your position

Keep the debate moving forward."#
            .to_string(),
        Cue::ModeratorRedirect => r#"Briefly redirect the debate if needed.
Either: probe deeper on a point, highlight an overlooked disagreement, or ask a debater to respond to something they've avoided."#
            .to_string(),
        Cue::GuestContribution => format!(
            "You are {speaker}, a guest expert invited to this debate. \
             Consider the arguments made so far and offer your unique perspective. \
             Be direct and substantive. Engage with the points that have been raised."
        ),
        Cue::ModeratorSummary => r#"Briefly summarize the key points of agreement and disagreement that emerged.
Then invite each debater to give their closing statement."#
            .to_string(),
        Cue::ClosingStatement => format!(
            r#"Give your closing statement on: {topic}

In 1-2 paragraphs:
1. Restate your core position
2. Acknowledge the strongest point made by an opponent
3. Explain why your view should still prevail
4. End with your key takeaway for the audience

Be memorable and persuasive."#
        ),
        Cue::GuestClosing => format!(
            r#"Give a brief closing statement on: {topic}

As a guest expert, summarize your key contribution to this debate in 1-2 paragraphs.
What perspective did you bring that was missing? What is your takeaway?"#
        ),
        Cue::ModeratorFarewell => "Thank the debaters and give a brief (2-3 sentence) closing that \
             highlights what made this debate valuable, without declaring a winner."
            .to_string(),
    }
}

/// Prompt asking the moderator to map out positions and disagreements.
pub fn position_analysis(topic: &str) -> String {
    format!(
        r#"Analyze the debate so far on: {topic}

For each debater, identify:
1. Their core position/stance
2. Their key arguments
3. Points where they disagree with others

Then identify the most significant disagreements that should be explored further.

Format your response as:

## Positions
[Debater Name]: [Core stance]
- Key argument 1
- Key argument 2

## Key Disagreements
1. [Debater A] vs [Debater B] on [specific point]
2. ...

## Recommended Focus
[What the debate should focus on next to be most productive]"#
    )
}
