//! 提示词配置 - 调研管线各阶段使用的提示词模板
//!
//! 查询生成层使用英文提示词，简报与编辑层统一输出中文。

use chrono::Utc;

use crate::pipeline::context::CompanyProfile;
use crate::pipeline::types::Category;

/// 报告编译阶段的系统提示词
pub const COMPILE_SYSTEM_PROMPT: &str =
    "You are an expert report editor that compiles research briefings into comprehensive company reports.";

/// 流式整理阶段的系统提示词
pub const CLEANUP_SYSTEM_PROMPT: &str =
    "You are an expert markdown formatter that ensures consistent document structure.";

/// 简报生成阶段的系统提示词
pub const BRIEFING_SYSTEM_PROMPT: &str =
    "You are a professional company research analyst that creates focused briefings from curated documents.";

/// 查询生成的系统提示词
pub fn query_system_prompt(profile: &CompanyProfile) -> String {
    format!(
        "You are researching {}, a company in the {} industry.",
        profile.company, profile.industry
    )
}

/// 查询生成的用户提示词
///
/// 要求模型每行输出一条查询，查询生成器按换行边界切分。
pub fn query_user_prompt(category: Category, profile: &CompanyProfile) -> String {
    let now = Utc::now();
    let focus = match category {
        Category::Company => format!(
            "Generate queries on the company fundamentals of {} such as products and services, \
             leadership team, target market and business model.",
            profile.company
        ),
        Category::Industry => format!(
            "Generate queries on the industry landscape of {} (a {} company) such as market size, \
             competitors, industry trends and market position.",
            profile.company, profile.industry
        ),
        Category::Financial => format!(
            "Generate queries on the financial standing of {} such as funding rounds, revenue, \
             investors and financial performance.",
            profile.company
        ),
        Category::News => format!(
            "Generate queries on the latest news of {} such as announcements, partnerships, \
             product launches and press coverage.",
            profile.company
        ),
    };

    format!(
        "Researching {} on {}.
{}

        Important Guidelines:
        - Focus ONLY on {}-specific information
        - Make queries very brief and to the point
        - Provide exactly 4 search queries (one per line), with no hyphens or dashes
        - DO NOT make assumptions about the industry - use only the provided industry information",
        profile.company,
        now.format("%B %d, %Y"),
        focus,
        profile.company
    )
}

/// 类目简报提示词（含装配好的文档块）
pub fn briefing_prompt(category: Category, profile: &CompanyProfile, doc_block: &str) -> String {
    let company = &profile.company;
    let industry = &profile.industry;
    let hq_location = &profile.hq_location;

    let header = match category {
        Category::Company => format!(
            r#"为{company}（一家位于{hq_location}的{industry}公司）创建一份重点公司简报。
关键要求：
1. 以这样的句式开始："{company}是一家[做什么的]，为[谁]提供[什么服务]"
2. 使用以下确切的标题和要点结构：

### 核心产品/服务
* 列出独特的产品/功能
* 仅包含经验证的技术能力

### 领导团队
* 列出关键领导团队成员
* 包括他们的角色和专长

### 目标市场
* 列出特定目标受众
* 列出经验证的使用案例
* 列出已确认的客户/合作伙伴

### 关键差异化因素
* 列出独特功能
* 列出已证实的优势

### 商业模式
* 讨论产品/服务定价
* 列出分销渠道

3. 每个要点必须是单一、完整的事实
4. 不要提及"未找到信息"或"无可用数据"
5. 不要使用段落，只使用要点
6. 仅提供简报内容，不要解释或评论
7. 所有内容必须使用中文输出"#
        ),
        Category::Industry => format!(
            r#"你是世界顶尖的行业分析师，精通市场研究、竞争情报和战略预测。为{company}（一家位于{hq_location}的{industry}公司）创建一份行业分析报告。

关键要求：
1. 基于公开数据、历史趋势和逻辑推测，生成清晰有条理的见解
2. 用假设做数据支持的预测（要说明假设）
3. 找出顶尖厂商，按细分领域、规模或创新性分类
4. 指出风险、新兴玩家和未来趋势
5. 明确区分估计数据和已知数据

使用以下结构：

### 1. 市场概览
* {company}的市场定位和细分
* 当前市场规模及增长趋势（注明数据来源年份）
* 关键驱动因素和制约因素

### 2. 主要参与者
* 按细分领域列出TOP 3-5厂商
* 各厂商的核心竞争力和市场份额估计
* 新兴玩家及其创新点

### 3. 预测（1-3年）
* 基于[具体假设]的增长预测
* 技术演进路线图
* 潜在颠覆性因素

### 4. 机会与风险
* 最具潜力的3个市场机会
* 需要警惕的2-3个主要风险
* 监管环境变化的影响

### 5. 战略洞见
* 对{company}的3条具体战略建议
* 需要重点关注的竞争领域
* 推荐的投资方向

注意事项：
1. 保持专业、简洁的分析风格
2. 使用中文标点符号和术语
3. 每个观点必须有数据或逻辑支持
4. 明确标注哪些是估计，哪些是已知数据"#
        ),
        Category::Financial => format!(
            r#"为{company}（一家位于{hq_location}的{industry}公司）创建一份重点财务简报。
关键要求：
1. 使用以下标题和要点结构：

### 融资与投资
* 总融资金额及日期
* 列出每轮融资及日期
* 列出具名投资者

### 收入模式
* 讨论产品/服务定价（如适用）

2. 尽可能包含具体数字
3. 不要使用段落，只使用要点
4. 不要提及"未找到信息"或"无可用数据"
5. 切勿重复提及同一轮融资。始终假设同一月份的多轮融资是同一轮
6. 不要包含融资金额范围。根据提供的信息，用你的最佳判断确定确切金额
7. 仅提供简报内容，不要解释或评论
8. 所有内容必须使用中文输出"#
        ),
        Category::News => format!(
            r#"为{company}（一家位于{hq_location}的{industry}公司）创建一份重点新闻简报。
关键要求：
1. 使用以下类别结构和要点：

### 重大公告
* 产品/服务发布
* 新举措

### 合作关系
* 集成
* 协作

### 荣誉认可
* 奖项
* 媒体报道

2. 按从新到旧排序
3. 每个要点一个事件
4. 不要提及"未找到信息"或"无可用数据"
5. 不要使用###标题，只使用要点
6. 仅提供简报内容，不要提供解释或评论
7. 所有内容必须使用中文输出"#
        ),
    };

    format!(
        r#"{header}

请分析以下文档并提取关键信息。仅提供简报内容，不要解释或评论。请使用中文输出所有内容：

{doc_block}

注意：
1. 所有内容必须使用中文输出
2. 保持专业、简洁的语言风格
3. 使用中文标点符号
4. 保持统一的中文术语翻译
"#
    )
}

/// 初始编译提示词 - 将各节简报合并为固定四节结构的报告
pub fn compile_prompt(profile: &CompanyProfile, combined_content: &str) -> String {
    let company = &profile.company;
    let industry = &profile.industry;
    let hq_location = &profile.hq_location;

    format!(
        r#"你正在编译关于{company}的综合研究报告。

已编译的简报内容：
{combined_content}

请创建一份关于{company}（一家总部位于{hq_location}的{industry}公司）的全面而重点突出的报告，要求：
1. 将所有部分的信息整合成一个连贯且不重复的叙述
2. 保留每个部分的重要细节
3. 逻辑地组织信息，删除过渡性评论/解释
4. 使用清晰的章节标题和结构

格式规则：
严格遵守以下确切的文档结构：

# {company}研究报告

## 公司概览
[公司内容，使用###子标题]

## 行业概览
[行业内容，使用###子标题]

## 财务概览
[财务内容，使用###子标题]

## 新闻
[新闻内容，使用###子标题]

请以清晰的markdown格式返回报告。不要添加解释或评论。所有内容必须使用中文输出。"#
    )
}

/// 流式整理提示词 - 去重并强制固定五节结构
pub fn cleanup_prompt(profile: &CompanyProfile, content: &str) -> String {
    let company = &profile.company;
    let industry = &profile.industry;
    let hq_location = &profile.hq_location;

    format!(
        r##"你是一位专业的简报编辑。你收到了一份关于{company}的报告。

当前报告：
{content}

请执行以下操作：
1. 删除冗余或重复的信息
2. 删除与{company}（一家总部位于{hq_location}的{industry}公司）无关的信息
3. 删除缺乏实质内容的部分
4. 删除任何元评论（例如"以下是新闻..."）

严格遵守以下确切的文档结构：

## 公司概览
[公司内容，使用###子标题]

## 行业概览
[行业内容，使用###子标题]

## 财务概览
[财务内容，使用###子标题]

## 新闻
[新闻内容，使用要点]

## 参考资料
[MLA格式的参考资料 - 完全按原样保留]

关键规则：
1. 文档必须以"# {company}研究报告"开头
2. 文档必须且只能按此顺序使用以下确切的##标题：
   - ## 公司概览
   - ## 行业概览
   - ## 财务概览
   - ## 新闻
   - ## 参考资料
3. 不允许使用其他##标题
4. 在公司/行业/财务部分使用###作为子标题
5. 新闻部分应只使用要点(*)，不使用标题
6. 不要使用代码块(```)
7. 各部分之间不要使用超过一个空行
8. 所有要点都使用*格式
9. 每个部分/列表前后添加一个空行
10. 不要更改参考资料部分的格式

请以完美的markdown格式返回润色后的报告。不要添加解释。所有内容必须使用中文输出。"##
    )
}
