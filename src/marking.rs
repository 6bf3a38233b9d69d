use anyhow::{Result, anyhow};
use std::fmt::{Debug, Display, Formatter};

#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Marking {
    pub(crate) place2token: Vec<u64>, //for each place: number of tokens in that place
}

impl Marking {
    pub fn new(size: usize) -> Self {
        Marking {
            place2token: vec![0; size],
        }
    }

    pub fn get_place2token(&self) -> &Vec<u64> {
        &self.place2token
    }

    pub fn from_vec(place2token: Vec<u64>) -> Self {
        Marking { place2token }
    }

    pub fn len(&self) -> usize {
        self.place2token.len()
    }

    pub fn has_no_tokens(&self) -> bool {
        self.place2token.iter().all(|tokens| *tokens == 0)
    }

    pub fn increase(&mut self, place: usize, amount: u64) -> Result<()> {
        let tokens = self
            .place2token
            .get_mut(place)
            .ok_or_else(|| anyhow!("place {} does not exist in the marking", place))?;
        *tokens = tokens.checked_add(amount).ok_or_else(|| {
            anyhow!(
                "tried to put too many tokens in a marking for place {}",
                place
            )
        })?;
        Ok(())
    }

    pub fn decrease(&mut self, place: usize, amount: u64) -> Result<()> {
        let tokens = self
            .place2token
            .get_mut(place)
            .ok_or_else(|| anyhow!("place {} does not exist in the marking", place))?;
        if *tokens < amount {
            return Err(anyhow!(
                "tried to obtain a negative number of tokens in a marking for place {}",
                place
            ));
        }
        *tokens -= amount;
        Ok(())
    }

    pub fn add_place(&mut self) {
        self.place2token.push(0);
    }
}

impl From<Vec<u64>> for Marking {
    fn from(value: Vec<u64>) -> Self {
        Self { place2token: value }
    }
}

impl Display for Marking {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        let mut first = true;
        for (place, multiplicity) in self.place2token.iter().enumerate() {
            if *multiplicity > 0 {
                if !first {
                    write!(f, ", ")?;
                }
                first = false;
                write!(f, "{}:{}", place, multiplicity)?;
            }
        }
        write!(f, "}}")
    }
}

impl Debug for Marking {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}
