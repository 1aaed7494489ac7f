//! ChatML rendering for chat messages.

use super::payloads::ChatMessage;

pub(crate) const TEMPLATE_NAME: &str = "chatml";

pub(crate) fn render_chatml(messages: &[ChatMessage], add_generation_prompt: bool) -> String {
    let mut prompt = String::new();
    for message in messages {
        prompt.push_str("<|im_start|>");
        prompt.push_str(&message.role);
        prompt.push('\n');
        prompt.push_str(&message.content.text());
        prompt.push_str("<|im_end|>\n");
    }
    if add_generation_prompt {
        prompt.push_str("<|im_start|>assistant\n");
    }
    prompt
}
