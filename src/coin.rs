use num_rational::Ratio;
use num_traits::{CheckedAdd, CheckedSub, Zero};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

/// Currency tag. The protocol runs a single currency, [`Currency::DEFAULT`];
/// coins of different currencies never add up.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Currency(pub u32);

impl Currency {
    pub const DEFAULT: Currency = Currency(0);
}

/// A non-negative rational amount of one currency. Amounts are unsigned by
/// construction, so a coin can never go negative.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coin {
    currency: Currency,
    amount: Ratio<u64>,
}

impl Coin {
    pub fn new(currency: Currency, amount: Ratio<u64>) -> Coin {
        Coin { currency, amount }
    }

    pub fn from_integer(units: u64) -> Coin {
        Coin {
            currency: Currency::DEFAULT,
            amount: Ratio::from_integer(units),
        }
    }

    pub fn zero(currency: Currency) -> Coin {
        Coin {
            currency,
            amount: Ratio::zero(),
        }
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn amount(&self) -> Ratio<u64> {
        self.amount
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn checked_add(&self, other: &Coin) -> Option<Coin> {
        if self.currency != other.currency {
            return None;
        }

        Some(Coin {
            currency: self.currency,
            amount: self.amount.checked_add(&other.amount)?,
        })
    }

    pub fn checked_sub(&self, other: &Coin) -> Option<Coin> {
        if self.currency != other.currency {
            return None;
        }

        Some(Coin {
            currency: self.currency,
            amount: self.amount.checked_sub(&other.amount)?,
        })
    }
}

/// Sum a collection of coins per currency. `None` on overflow.
pub fn totals<'a>(
    coins: impl IntoIterator<Item = &'a Coin>,
) -> Option<BTreeMap<Currency, Ratio<u64>>> {
    let mut by_currency = BTreeMap::new();

    for coin in coins {
        let total = by_currency
            .entry(coin.currency)
            .or_insert_with(Ratio::zero);
        *total = total.checked_add(&coin.amount)?;
    }

    Some(by_currency)
}

impl fmt::Debug for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Coin({} @{})", self, self.currency.0)
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.amount.is_integer() {
            write!(f, "{}", self.amount.numer())
        } else {
            write!(f, "{}/{}", self.amount.numer(), self.amount.denom())
        }
    }
}
