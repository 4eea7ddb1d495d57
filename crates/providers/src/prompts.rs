//! Prompt builders for the three Reasoner calls.
//!
//! Each builder renders [`PromptMaterials`] into a short chat: one system
//! message describing the role, one user message carrying the materials.

use intentus_core::message::Message;
use intentus_core::reasoner::PromptMaterials;

const SYSTEM_PROMPT: &str = "You are the planning core of an assistant that turns perceived \
events and user requests into actions. You are precise, you only use the tools you are \
offered, and you stop as soon as the request is answered.";

/// Query analysis: objectives, required skills, considerations.
pub fn analysis(materials: &PromptMaterials) -> Vec<Message> {
    let mut body = String::from(
        "Task: Analyze the query below and determine what is needed to address it.\n\n",
    );
    push_query_and_context(&mut body, materials);
    push_tools(&mut body, materials);
    body.push_str(
        "\nRespond with:\n\
         1. A concise summary of the query's main objectives.\n\
         2. The skills or tools required, with one line on why each helps.\n\
         3. Any additional considerations.\n",
    );
    vec![Message::system(SYSTEM_PROMPT), Message::user(body)]
}

/// Direct first-pass answer, without tools.
pub fn base_response(materials: &PromptMaterials) -> Vec<Message> {
    let mut body =
        String::from("Task: Answer the query directly from your own knowledge, without tools.\n\n");
    push_query_and_context(&mut body, materials);
    body.push_str("\nBe clear and concise, and answer the query directly.\n");
    vec![Message::system(SYSTEM_PROMPT), Message::user(body)]
}

/// Next-step decision, answered as a single JSON object.
pub fn decision(materials: &PromptMaterials) -> Vec<Message> {
    let mut body = String::from(
        "Task: Decide the single next action for the query below, given the steps so far.\n\n",
    );
    push_query_and_context(&mut body, materials);
    if let Some(analysis) = &materials.analysis {
        body.push_str(&format!("Query Analysis:\n{analysis}\n\n"));
    }
    push_tools(&mut body, materials);

    body.push_str("\nPrevious Steps and Their Results:\n");
    if materials.memory.is_empty() {
        body.push_str("(none)\n");
    } else {
        for record in &materials.memory {
            body.push_str(&record.summary());
            body.push('\n');
        }
    }

    body.push_str(&format!(
        "\nCurrent Step: {} of {} (remaining after this one: {})\n",
        materials.step,
        materials.max_steps,
        materials.max_steps.saturating_sub(materials.step)
    ));

    if let Some(error) = &materials.last_error {
        body.push_str(&format!(
            "\nYour previous decision could not be used: {error}\nRespond again, following the format exactly.\n"
        ));
    }

    body.push_str(
        "\nRespond with exactly one JSON object and nothing else, in one of these forms:\n\
         {\"action\": \"invoke_tool\", \"tool\": \"<tool name>\", \"arguments\": {...}, \"rationale\": \"<why>\"}\n\
         {\"action\": \"final_answer\", \"answer\": \"<the answer>\", \"rationale\": \"<why>\"}\n\
         {\"action\": \"clarify\", \"question\": \"<what you need to know>\"}\n\
         Rules:\n\
         - The tool name MUST exactly match one of the available tools.\n\
         - Arguments MUST follow the tool's argument schema.\n\
         - Give the final answer as soon as the results are sufficient.\n",
    );

    vec![Message::system(SYSTEM_PROMPT), Message::user(body)]
}

fn push_query_and_context(body: &mut String, materials: &PromptMaterials) {
    body.push_str(&format!("Query: {}\n", materials.query));
    if let Some(context) = &materials.context {
        let rendered = serde_json::to_string_pretty(context).unwrap_or_else(|_| context.to_string());
        body.push_str(&format!("Context:\n{rendered}\n"));
    }
    body.push('\n');
}

fn push_tools(body: &mut String, materials: &PromptMaterials) {
    body.push_str("Available Tools:\n");
    if materials.tools.is_empty() {
        body.push_str("(none)\n");
        return;
    }
    for tool in &materials.tools {
        body.push_str(&format!(
            "- {}: {}\n  arguments: {}\n",
            tool.name, tool.description, tool.parameters
        ));
    }
}
