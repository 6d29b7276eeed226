//! Prompt rendering for the next-draw prediction.
//!
//! Pure functions: the same draws always render the same two instruction blocks.

use crate::draws::{DrawCode, WINDOW_SIZE};

/// Upper bound on how many recent draws are sent to the model.
pub const PROMPT_HISTORY_LEN: usize = if WINDOW_SIZE + 1 > 64 { WINDOW_SIZE + 1 } else { 64 };

pub const SYSTEM_PROMPT: &str = "你是一个号码走势分析助手。\n\
给你按时间顺序排列的历史5位号码（每行一个，最早的在前）。请预测下一期（N+1）的【前四】与【后四】是否“重号”。\n\
定义：前四=第1~4位；后四=第2~5位；若这4位中存在相同数字则为“重复”（也可写作“重号”），否则为“不重”。\n\
请结合近期频率、位置分布与转移倾向给出判断，并给出置信度（0~1）。\n\
同时估计与决策阈值τ*的相对距离（0~1，越大越远离边界）。\n\
严格以 JSON 返回，字段：front, back, front_confidence, back_confidence, front_tau_distance, back_tau_distance, notes（可选）。不要输出多余文本。";

/// Appended to the user instruction when the strict schema mode is unavailable.
pub const JSON_ONLY_REINFORCEMENT: &str = "务必只输出一个 JSON 对象，包含上述字段，不要任何多余文字。";

/// The two instruction blocks sent with every prediction request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

impl PromptPair {
    /// Appends the JSON-object-only sentence to the user instruction.
    pub fn reinforce_json_only(&mut self) {
        if !self.user.ends_with(JSON_ONLY_REINFORCEMENT) {
            self.user.push('\n');
            self.user.push_str(JSON_ONLY_REINFORCEMENT);
        }
    }
}

/// The most recent [`PROMPT_HISTORY_LEN`] draws, or all of them if fewer.
pub fn prompt_window(draws: &[DrawCode]) -> &[DrawCode] {
    let start = draws.len().saturating_sub(PROMPT_HISTORY_LEN);
    &draws[start..]
}

pub fn build_prompts(draws: &[DrawCode]) -> PromptPair {
    let series = prompt_window(draws)
        .iter()
        .map(DrawCode::as_str)
        .collect::<Vec<_>>()
        .join("\n");

    let user = format!(
        "历史序列（每行5位，时间由旧到新）：\n{}\n\n\
         请输出字段：front, back, front_confidence, back_confidence, \
         front_tau_distance, back_tau_distance, notes（可选）。",
        series
    );

    PromptPair {
        system: SYSTEM_PROMPT.to_string(),
        user,
    }
}
