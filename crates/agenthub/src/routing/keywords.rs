use crate::models::agent::AgentDescriptor;

/// Shortest hint token, in characters, that is allowed to match
const MIN_TOKEN_CHARS: usize = 2;

/// Split a routing hint into lowercase keywords on commas and semicolons
pub fn hint_tokens(hint: &str) -> Vec<String> {
    hint.split([',', ';'])
        .map(|token| token.trim().to_lowercase())
        .filter(|token| token.chars().count() >= MIN_TOKEN_CHARS)
        .collect()
}

/// Aliases of agents outside `selected` whose routing hint occurs in the prompt
pub fn match_keywords(prompt: &str, catalog: &[AgentDescriptor], selected: &[String]) -> Vec<String> {
    let prompt = prompt.to_lowercase();
    let mut matched: Vec<String> = Vec::new();

    for agent in catalog {
        if selected.contains(&agent.alias) || matched.contains(&agent.alias) {
            continue;
        }
        let Some(hint) = agent.hint() else {
            continue;
        };
        if hint_tokens(hint)
            .iter()
            .any(|token| prompt.contains(token.as_str()))
        {
            matched.push(agent.alias.clone());
        }
    }

    matched
}

/// Classifier selection followed by keyword matches. Nothing is removed or deduplicated.
pub fn merge_selection(
    classified: Vec<String>,
    prompt: &str,
    catalog: &[AgentDescriptor],
) -> Vec<String> {
    let extra = match_keywords(prompt, catalog, &classified);
    let mut selection = classified;
    selection.extend(extra);
    selection
}
