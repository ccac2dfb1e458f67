use std::io::Write;

use super::Reimbursement;
use crate::error::Result;

/// Writes `recipient,amountInWei` lines, flushing after every event so a
/// later failure never loses output already produced.
pub struct ReportWriter<W: Write> {
    out: W,
    lines: usize,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, lines: 0 }
    }

    pub fn write_event(&mut self, reimbursements: &[Reimbursement]) -> Result<()> {
        for r in reimbursements {
            writeln!(self.out, "{}", r)?;
        }
        self.out.flush()?;
        self.lines += reimbursements.len();
        Ok(())
    }

    /// Lines written so far.
    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;

    #[test]
    fn test_writes_csv_lines_without_decimal_point() {
        let mut writer = ReportWriter::new(Vec::new());
        writer
            .write_event(&[
                Reimbursement {
                    recipient: "0xa".into(),
                    amount: BigUint::parse_bytes(b"1000000000000000000000000000001", 10).unwrap(),
                },
                Reimbursement {
                    recipient: "0xb".into(),
                    amount: BigUint::from(0u32),
                },
            ])
            .unwrap();

        assert_eq!(writer.lines(), 2);
        let out = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(out, "0xa,1000000000000000000000000000001\n0xb,0\n");
    }
}
