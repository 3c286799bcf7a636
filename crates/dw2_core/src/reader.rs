use std::io::{self, Read};

pub struct LittleEndianReader<R> {
    inner: R,
}

impl<R: Read> LittleEndianReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn read_u32(&mut self) -> io::Result<u32> {
        let mut buf = [0u8; 4];
        self.inner.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    pub fn read_array<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn read_u32_vec(&mut self, n: usize) -> io::Result<Vec<u32>> {
        let mut result = Vec::with_capacity(n);
        for _ in 0..n {
            result.push(self.read_u32()?);
        }
        Ok(result)
    }

    pub fn read_bytes(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read an `n`-byte NUL-padded field as ASCII. Text ends at the first NUL;
    /// bytes outside the ASCII range are dropped.
    pub fn read_ascii_field(&mut self, n: usize) -> io::Result<String> {
        let bytes = self.read_bytes(n)?;
        Ok(decode_ascii_field(&bytes))
    }
}

pub fn decode_ascii_field(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    bytes[..end]
        .iter()
        .filter(|b| b.is_ascii())
        .map(|&b| b as char)
        .collect()
}
