//! Prompt assembly for policy queries

/// Text substituted for a table the client did not send
pub const MISSING_TABLE: &str = "未上传数据。";

/// Returned when the model produces no text
pub const FALLBACK_TEXT: &str = "查询超时或无结果，请检查表格数据是否包含该关键词。";

pub const SYSTEM_INSTRUCTION: &str = "你是一位专业的差旅费报销审核官，具备极强的数据比对能力。
你的回复必须基于“双表联查”的结果。

### 严苛回复规则：
1. **职级敏感度**：识别用户职级（高层、中层、基层），严格匹配标准。
2. **多表联查链条**：目的地 -> 分类表 -> 判定地区类别；单位+职级 -> 标准表 -> 读取金额。
3. **核心字段提取**：必须完整列出交通工具（含轮船）、住宿、伙食、在途日补助、始末日补助。

4. **输出格式**：
   【核查报告】
   - 目的地判定：[目的地名称] -> [判定分类]
   - 职级定位：[单位] | [职级]
   ---------------------------------
   【详细标准】
   - 交通工具：...
   - 住宿标准：...
   - 伙食补助：...
   - 在途日补助：...
   - 始末日补助：...
   - 其他备注：...";

const EXTRACTION_REQUIREMENTS: &str = "---
### 逻辑执行深度要求：
- **目的地与职级**：精准匹配。
- **交通工具**：必须捕获“轮船”及相关等级信息。
- **补助明细**：在 [TABLE_STANDARDS] 中重点检索以下列或关键词：
  1. “伙食补助”
  2. “在途日补助” 或 “在途补贴”
  3. “始末日补助” 或 “起止日补贴”
- 如果这些数据分布在不同的列中，请准确提取对应职级的数值。
";

fn table_or_placeholder(table: Option<&str>) -> &str {
    match table {
        Some(t) if !t.is_empty() => t,
        _ => MISSING_TABLE,
    }
}

/// Context block embedding both tables verbatim
pub fn build_context(region_table: Option<&str>, standard_table: Option<&str>) -> String {
    format!(
        "\n### 数据库 A：地区分类表 (TABLE_REGIONS)\n{}\n\n### 数据库 B：费用控制标准表 (TABLE_STANDARDS)\n{}\n\n{}",
        table_or_placeholder(region_table),
        table_or_placeholder(standard_table),
        EXTRACTION_REQUIREMENTS,
    )
}

/// Prompt parts in send order: table context, instruction, user question
pub fn build_parts(
    user_message: &str,
    region_table: Option<&str>,
    standard_table: Option<&str>,
) -> Vec<String> {
    vec![
        build_context(region_table, standard_table),
        SYSTEM_INSTRUCTION.to_string(),
        format!("用户咨询：{}", user_message),
    ]
}
