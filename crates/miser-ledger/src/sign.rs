use miser_core::Millionths;
use miser_journal::AccountType;

/// Which side of a posted transaction an account sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Destination,
}

/// Signed delta to apply to an account's running balance for one side of a
/// transaction of `value` millionths, per the sign table:
///
/// - Asset / Expense: source (credit) subtracts, destination (debit) adds.
/// - Liability / Equity / Income: source (credit) adds, destination
///   (debit) subtracts.
pub fn delta(account_type: AccountType, side: Side, value: Millionths) -> Millionths {
    use AccountType::*;
    use Side::*;
    match (account_type, side) {
        (Asset | Expense, Source) => -value,
        (Asset | Expense, Destination) => value,
        (Liability | Equity | Income, Source) => value,
        (Liability | Equity | Income, Destination) => -value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_source_subtracts_and_destination_adds() {
        assert_eq!(delta(AccountType::Asset, Side::Source, 100), -100);
        assert_eq!(delta(AccountType::Asset, Side::Destination, 100), 100);
    }

    #[test]
    fn income_source_adds_and_destination_subtracts() {
        assert_eq!(delta(AccountType::Income, Side::Source, 100), 100);
        assert_eq!(delta(AccountType::Income, Side::Destination, 100), -100);
    }
}
