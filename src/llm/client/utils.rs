use crate::config::LLMConfig;

/// 按prompt规模选择模型
///
/// 常规规模优先使用高能效模型并以高质量模型兜底；
/// 超大prompt直接使用高质量模型，不再提供兜底。
pub fn evaluate_befitting_model(
    llm_config: &LLMConfig,
    system_prompt: &str,
    user_prompt: &str,
) -> (String, Option<String>) {
    if system_prompt.len() + user_prompt.len() <= 32 * 1024 {
        return (
            llm_config.model_efficient.clone(),
            Some(llm_config.model_powerful.clone()),
        );
    }
    (llm_config.model_powerful.clone(), None)
}
