//! zigzag maps signed integers onto unsigned integers so that values of small magnitude stay small
//! under varint encoding.  Negative values i map to -2i-1; non-negative values of i map to 2i.

pub fn zigzag(x: i64) -> u64 {
    ((x << 1) ^ (x >> 63)) as u64
}

pub fn unzigzag(x: u64) -> i64 {
    ((x >> 1) as i64) ^ (-((x & 1) as i64))
}

pub fn zigzag32(x: i32) -> u32 {
    ((x << 1) ^ (x >> 31)) as u32
}

pub fn unzigzag32(x: u32) -> i32 {
    ((x >> 1) as i32) ^ (-((x & 1) as i32))
}
