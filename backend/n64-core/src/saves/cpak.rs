//! Freshly formatted Controller Pak images
//!
//! A formatted pak has a label area, an ID block (plus 3 backups) with valid checksums, and two
//! copies of the inode table with every page marked free. The templates differ only in the ID
//! block's serial bytes so that a game sees each inserted pak as a different pak.
//!
//! Reference: <https://n64brew.dev/wiki/Controller_Pak/Filesystem>

use crate::saves::PAK_SIZE;

pub const TEMPLATE_COUNT: usize = 4;

const LABEL_LEN: usize = 0x20;
const ID_BLOCK_LEN: usize = 0x20;
const ID_BLOCK_ADDRS: [usize; 4] = [0x20, 0x60, 0x80, 0xC0];
const INODE_TABLE_ADDRS: [usize; 2] = [0x100, 0x200];
const PAGE_LEN: usize = 0x100;

/// Pages 0-4 hold the label, ID blocks, inode tables and note table
const FIRST_DATA_PAGE: usize = 5;
const INODE_FREE: [u8; 2] = [0x00, 0x03];

const SERIALS: [[u8; 4]; TEMPLATE_COUNT] = [
    [0x05, 0x1A, 0x5F, 0x13],
    [0x05, 0x1A, 0x5F, 0x27],
    [0x05, 0x1A, 0x60, 0x3B],
    [0x05, 0x1A, 0x60, 0x4F],
];

fn id_block(serial: [u8; 4]) -> [u8; ID_BLOCK_LEN] {
    let mut block = [0; ID_BLOCK_LEN];
    block[0x00..0x04].fill(0xFF);
    block[0x04..0x08].copy_from_slice(&serial);
    block[0x10..0x18].fill(0xFF);
    // Device ID and bank count
    block[0x18..0x1C].copy_from_slice(&[0xFF, 0xFF, 0x01, 0xFF]);

    let checksum = id_block_checksum(&block);
    block[0x1C..0x1E].copy_from_slice(&checksum.to_be_bytes());
    block[0x1E..0x20].copy_from_slice(&0xFFF2_u16.wrapping_sub(checksum).to_be_bytes());

    block
}

/// Sum of the first 14 big-endian halfwords
pub(crate) fn id_block_checksum(block: &[u8]) -> u16 {
    block[..0x1C]
        .chunks_exact(2)
        .fold(0_u16, |sum, word| sum.wrapping_add(u16::from_be_bytes([word[0], word[1]])))
}

fn inode_table() -> [u8; PAGE_LEN] {
    let mut table = [0; PAGE_LEN];
    for entry in table.chunks_exact_mut(2).skip(FIRST_DATA_PAGE) {
        entry.copy_from_slice(&INODE_FREE);
    }

    let checksum = table[2 * FIRST_DATA_PAGE..].iter().fold(0_u8, |sum, &b| sum.wrapping_add(b));
    table[1] = checksum;

    table
}

/// Formatted pak image for the given mount slot. Slots wrap around the template set.
#[must_use]
pub fn template(slot: usize) -> Vec<u8> {
    let mut image = vec![0; PAK_SIZE];

    for (i, byte) in image[..LABEL_LEN].iter_mut().enumerate() {
        *byte = i as u8;
    }
    image[0] = 0x81;

    let id_block = id_block(SERIALS[slot % TEMPLATE_COUNT]);
    for addr in ID_BLOCK_ADDRS {
        image[addr..addr + ID_BLOCK_LEN].copy_from_slice(&id_block);
    }

    let inode_table = inode_table();
    for addr in INODE_TABLE_ADDRS {
        image[addr..addr + PAGE_LEN].copy_from_slice(&inode_table);
    }

    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn first_template_id_block() {
        let image = template(0);
        assert_eq!(
            image[0x20..0x40],
            [
                0xFF, 0xFF, 0xFF, 0xFF, 0x05, 0x1A, 0x5F, 0x13, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
                0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0xFF,
                0x66, 0x25, 0x99, 0xCD
            ]
        );
    }

    #[test]
    fn every_template_is_consistent() {
        for slot in 0..TEMPLATE_COUNT {
            let image = template(slot);
            assert_eq!(image.len(), PAK_SIZE);
            assert_eq!(image[0], 0x81);
            assert_eq!(image[0x1F], 0x1F);

            for addr in ID_BLOCK_ADDRS {
                let block = &image[addr..addr + ID_BLOCK_LEN];
                assert_eq!(block, &image[0x20..0x40]);

                let checksum = id_block_checksum(block);
                assert_eq!(u16::from_be_bytes([block[0x1C], block[0x1D]]), checksum);
                assert_eq!(
                    u16::from_be_bytes([block[0x1E], block[0x1F]]),
                    0xFFF2_u16.wrapping_sub(checksum)
                );
            }

            for addr in INODE_TABLE_ADDRS {
                assert_eq!(image[addr + 1], 0x71);
                assert_eq!(image[addr + 10..addr + 12], INODE_FREE);
                assert_eq!(image[addr + 0xFE..addr + 0x100], INODE_FREE);
            }

            assert!(image[0x300..].iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn templates_have_distinct_serials() {
        let serials: Vec<_> = (0..TEMPLATE_COUNT).map(|slot| template(slot)[0x24..0x28].to_vec()).collect();
        for (i, serial) in serials.iter().enumerate() {
            assert!(serials[i + 1..].iter().all(|other| other != serial));
        }

        assert_eq!(template(TEMPLATE_COUNT), template(0));
    }
}
