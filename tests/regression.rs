//! Regression scenarios for the two smell rules and parse recovery.

use imcg::{analyze_source, Finding, RuleId, Severity};
use std::path::Path;

fn findings(name: &str, text: &str) -> Vec<Finding> {
    analyze_source(Path::new(name), text)
        .unwrap_or_else(|e| panic!("analyze({}) failed: {}", name, e))
        .findings
}

fn of_rule(findings: &[Finding], rule: RuleId) -> Vec<&Finding> {
    findings.iter().filter(|f| f.rule == rule).collect()
}

#[test]
fn attributed_test_with_setup_reports_once_at_the_call() {
    let text = r#"
[TestClass]
public class OrderTests
{
    [TestMethod]
    public void Places()
    {
        _repo.Setup(r => r.Save(It.IsAny<Order>())).Returns(true);
        Assert.IsTrue(service.Place(order));
    }
}
"#;
    let all = findings("OrderTests.cs", text);
    let setups = of_rule(&all, RuleId::SetupWithinTest);
    assert_eq!(setups.len(), 1);
    assert_eq!(setups[0].location.line, 8);
}

#[test]
fn five_parameters_against_four_is_flagged() {
    let text = r#"
public class Calc
{
    private int CalculateComplexValue(int a, int b, int c, int d, int e)
    {
        return a + b + c + d + e;
    }
}
"#;
    let all = findings("Calc.cs", text);
    let too_many = of_rule(&all, RuleId::TooManyArguments);
    assert_eq!(too_many.len(), 1);
    assert_eq!(
        too_many[0].message,
        "'CalculateComplexValue' declares 5 parameters (max 4)"
    );
}

#[test]
fn exactly_four_parameters_passes() {
    let text = r#"
public class Calc
{
    private int Sum(int a, int b, int c, int d)
    {
        return a + b + c + d;
    }
}
"#;
    assert!(of_rule(&findings("Calc.cs", text), RuleId::TooManyArguments).is_empty());
}

#[test]
fn truncated_block_keeps_earlier_declarations() {
    let text = r#"
public class Calc
{
    private int Wide(int a, int b, int c, int d, int e)
    {
        return a;
    }

    public void Broken()
    {
        if (ready) {
            Run(
"#;
    let all = findings("Calc.cs", text);
    assert_eq!(of_rule(&all, RuleId::TooManyArguments).len(), 1);
    let parse_errors = of_rule(&all, RuleId::StructuralParseError);
    assert_eq!(parse_errors.len(), 1);
    assert_eq!(parse_errors[0].severity, Severity::Info);
}

#[test]
fn attribute_and_registration_styles_agree() {
    let csharp = r#"
public class CartTests
{
    [Fact]
    public void Totals()
    {
        _prices.Setup(p => p.Get(1)).Returns(3);
    }
}
"#;
    let typescript = r#"
describe('cart', () => {
  it('totals', () => {
    prices.get.mockReturnValue(3);
  });
});
"#;
    let from_attribute = findings("CartTests.cs", csharp);
    let from_registration = findings("cart.test.ts", typescript);
    assert_eq!(from_attribute.len(), 1);
    assert_eq!(from_registration.len(), 1);
    assert_eq!(from_attribute[0].rule, from_registration[0].rule);
    assert_eq!(from_attribute[0].rule, RuleId::SetupWithinTest);
    assert_eq!(from_attribute[0].severity, from_registration[0].severity);
}

#[test]
fn setup_in_shared_hooks_is_not_reported() {
    let text = r#"
describe('cart', () => {
  beforeEach(() => {
    prices.get.mockReturnValue(3);
  });

  it('totals', () => {
    expect(cart.total()).toBe(3);
  });
});
"#;
    assert!(findings("cart.test.ts", text).is_empty());
}
