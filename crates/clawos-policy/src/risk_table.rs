use clawos_types::RiskLevel;

/// Intrinsic risk level of a named tool, independent of its policy mode.
/// `evaluateScope` uses this to pick the highest-risk tool in a scope.
/// Unknown tools default to `Low` rather than failing closed — the policy
/// *mode* (auto/ask/block), not this table, is what actually gates
/// execution.
pub fn tool_risk_level(tool_name: &str) -> RiskLevel {
    match tool_name {
        "run_shell" | "delete_file" | "send_payment" => RiskLevel::High,
        "send_email" | "file_write" | "http_post" => RiskLevel::Medium,
        _ => RiskLevel::Low,
    }
}
