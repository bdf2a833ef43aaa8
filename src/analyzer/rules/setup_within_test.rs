//! Setup within test - mock configuration performed inside a test body

use std::collections::HashSet;

use super::{RuleContext, SmellRule};
use crate::parser::{CallSite, DeclarationKind};
use crate::{Finding, Location, RuleId};

/// Rule for detecting stub/mock configuration inside test cases.
///
/// Only calls owned directly by a test case count; configuration inside a
/// nested function literal (a helper closure, a hook) is that literal's
/// business. Receiver-gated methods count on a bound mock or on a chain
/// rooted in a factory call. A fluent chain such as `_repo.Setup(...).Returns(...)` is one
/// configuration and is reported once, at its first matching call.
#[derive(Debug, Default)]
pub struct SetupWithinTestRule;

impl SetupWithinTestRule {
    pub fn new() -> Self {
        Self
    }

    fn location(call: &CallSite) -> Location {
        let width = call.method.chars().count().max(1);
        Location::new(call.position.line, call.position.column)
            .with_end(call.position.line, call.position.column + width)
    }
}

impl SmellRule for SetupWithinTestRule {
    fn id(&self) -> RuleId {
        RuleId::SetupWithinTest
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let matcher = &ctx.profile.matchers.mock;
        let mut findings = Vec::new();

        for test in ctx.tree.of_kind(DeclarationKind::TestCase) {
            let mut reported_chains = HashSet::new();
            // Chains that create a double inline: `sinon.stub(repo, 'find').returns(x)`
            let mut factory_chains = HashSet::new();
            for call in &test.calls {
                if matcher.is_factory(&call.callee) {
                    factory_chains.insert(call.chain);
                    continue;
                }
                let receiver_is_mock = factory_chains.contains(&call.chain)
                    || call
                        .receiver
                        .as_deref()
                        .is_some_and(|r| ctx.tree.is_mock(r, Some(test.id)));
                if !matcher.is_configuration(&call.callee, &call.method, receiver_is_mock) {
                    continue;
                }
                if !reported_chains.insert(call.chain) {
                    continue;
                }

                let test_name = if test.name.is_empty() {
                    "<anonymous>"
                } else {
                    test.name.as_str()
                };
                findings.push(
                    Finding::new(
                        RuleId::SetupWithinTest,
                        ctx.path,
                        Self::location(call),
                        format!(
                            "Mock configuration '{}' inside test '{}'; setup belongs in a shared arrange phase",
                            call.callee, test_name
                        ),
                    )
                    .with_suggestion(ctx.profile.setup_hint),
                );
            }
        }

        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::rules::test_support::run;
    use crate::language::LanguageId;

    fn check(lang: LanguageId, source: &str) -> Vec<Finding> {
        run(&SetupWithinTestRule::new(), lang, source)
    }

    fn lines(findings: &[Finding]) -> Vec<usize> {
        findings.iter().map(|f| f.location.line).collect()
    }

    #[test]
    fn test_moq_setup_in_test_method() {
        let source = r#"
[TestClass]
public class OrderTests
{
    private Mock<IRepo> _repo = new Mock<IRepo>();

    [TestMethod]
    public void Saves()
    {
        _repo.Setup(r => r.Get(1)).Returns(new Order());
        var sut = new OrderService(_repo.Object);
        sut.Save();
    }
}
"#;
        let findings = check(LanguageId::CSharp, source);
        assert_eq!(lines(&findings), vec![10]);
        assert_eq!(findings[0].rule, RuleId::SetupWithinTest);
        assert_eq!(findings[0].location.column, 15);
        assert!(findings[0].message.contains("Saves"));
        assert!(findings[0].suggestion.as_deref().unwrap().contains("[TestInitialize]"));
    }

    #[test]
    fn test_setup_in_initializer_is_fine() {
        let source = r#"
[TestFixture]
public class OrderTests
{
    private Mock<IRepo> _repo;

    [SetUp]
    public void Init()
    {
        _repo = new Mock<IRepo>();
        _repo.Setup(r => r.Get(1)).Returns(new Order());
    }

    [Test]
    public void Saves()
    {
        Assert.IsTrue(new OrderService(_repo.Object).Save());
    }
}
"#;
        assert!(check(LanguageId::CSharp, source).is_empty());
    }

    #[test]
    fn test_each_chain_reported_once() {
        let source = r#"
public class CalcTests
{
    [Fact]
    public void Adds()
    {
        var calc = Substitute.For<ICalculator>();
        calc.Add(1, 2).Returns(3);
        calc.Mode.Returns("DEC");
        Assert.Equal(3, calc.Add(1, 2));
    }
}
"#;
        let findings = check(LanguageId::CSharp, source);
        assert_eq!(lines(&findings), vec![8, 9]);
    }

    #[test]
    fn test_gated_method_on_plain_object_is_fine() {
        let source = r#"
public class ParserTests
{
    [Fact]
    public void Parses()
    {
        var builder = new QueryBuilder();
        builder.Where("x").Returns("y");
    }
}
"#;
        assert!(check(LanguageId::CSharp, source).is_empty());
    }

    #[test]
    fn test_local_mock_does_not_leak_into_other_tests() {
        let source = r#"
public class CalcTests
{
    [Fact]
    public void WithDouble()
    {
        var calc = Substitute.For<ICalculator>();
        calc.Add(1, 2).Returns(3);
    }

    [Fact]
    public void WithRealCalculator()
    {
        var calc = new Calculator();
        calc.Add(1, 2).Returns(3);
    }
}
"#;
        let findings = check(LanguageId::CSharp, source);
        assert_eq!(lines(&findings), vec![8]);
        assert!(findings[0].message.contains("WithDouble"));
    }

    #[test]
    fn test_sinon_inline_stub_chain() {
        let source = r#"
it('finds the user', () => {
  sinon.stub(repo, 'find').returns(user);
  const save = sinon.stub();
  save.resolves(true);
});
"#;
        let findings = check(LanguageId::TypeScript, source);
        assert_eq!(lines(&findings), vec![3, 5]);
        assert!(findings[0].message.contains("sinon.stub(...).returns"));
    }

    #[test]
    fn test_stub_assigned_in_hook_is_visible_to_tests() {
        let source = r#"
describe('users', () => {
  let repo;

  beforeEach(() => {
    repo = sinon.createStubInstance(Repo);
  });

  it('finds', () => {
    repo.find.returns(user);
  });
});
"#;
        let findings = check(LanguageId::JavaScript, source);
        assert_eq!(lines(&findings), vec![10]);
    }

    #[test]
    fn test_jest_mock_return_value_in_it() {
        let source = r#"
describe('cart', () => {
  const fetchPrice = jest.fn();

  beforeEach(() => {
    fetchPrice.mockReturnValue(10);
  });

  it('adds items', () => {
    fetchPrice.mockReturnValueOnce(5);
    expect(total()).toBe(5);
  });

  it('is empty', () => {
    expect(total()).toBe(0);
  });
});
"#;
        let findings = check(LanguageId::TypeScript, source);
        assert_eq!(lines(&findings), vec![10]);
        assert!(findings[0].message.contains("adds items"));
        assert!(findings[0].suggestion.as_deref().unwrap().contains("beforeEach"));
    }

    #[test]
    fn test_nested_helper_literal_is_not_the_test_body() {
        let source = r#"
it('retries', async () => {
  const arrange = () => {
    api.get.mockResolvedValue({ ok: true });
  };
  arrange();
  await expect(load()).resolves.toBeTruthy();
});
"#;
        assert!(check(LanguageId::TypeScript, source).is_empty());
    }

    #[test]
    fn test_mockito_when_then_return() {
        let source = r#"
class ServiceTest {
    @Mock
    Repository repo;

    @Test
    void findsUser() {
        when(repo.find(1)).thenReturn(user);
        assertEquals(user, service.find(1));
    }
}
"#;
        let findings = check(LanguageId::Java, source);
        assert_eq!(lines(&findings), vec![8]);
    }

    #[test]
    fn test_dart_when_inside_test_registration() {
        let source = r#"
void main() {
  group('Cart', () {
    test('totals', () {
      when(() => prices.get(any())).thenReturn(3);
      expect(cart.total, 3);
    });
  });
}
"#;
        let findings = check(LanguageId::Dart, source);
        assert_eq!(lines(&findings), vec![5]);
    }

    #[test]
    fn test_no_tests_no_findings() {
        let source = "class Helper { void Arrange() { _repo.Setup(x => x.Get()); } }";
        assert!(check(LanguageId::CSharp, source).is_empty());
    }
}
