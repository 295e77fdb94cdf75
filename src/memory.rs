pub type Byte = u8; // 1 byte

/// Number of addressable bytes; addresses are a single byte wide.
pub const MEMORY_SIZE: usize = 256;

/// Emulates a flat 256-byte memory for use with the CPU.
///
/// Both program memory and the stack are instances of this type. Positions
/// are a single [`Byte`], so every possible address is in range and
/// wraparound aliasing is defined behavior rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Memory {
    /// The actual data of the memory
    pub data: [Byte; MEMORY_SIZE],
}

impl Default for Memory {
    /// Initializes the memory
    fn default() -> Self {
        Memory {
            data: [0; MEMORY_SIZE],
        }
    }
}

impl Memory {
    /// Reads a byte from the memory
    pub fn read_byte(&self, position: Byte) -> Byte {
        self.data[position as usize]
    }

    /// Writes a byte to the memory
    pub fn write_byte(&mut self, position: Byte, value: Byte) {
        self.data[position as usize] = value;
    }

    /// Zeroes the whole memory
    pub fn clear(&mut self) {
        self.data = [0; MEMORY_SIZE];
    }

    /// Writes an array of bytes to the memory
    pub fn write_array(&mut self, position: Byte, data: &[Byte]) {
        self.data[position as usize..position as usize + data.len()].copy_from_slice(data);
    }
}

/// Writes a block of instructions directly into the memory
#[macro_export]
macro_rules! write_instructions {
    ( $mem:ident : $pos:expr => $( $byte:expr ),+ $(,)? ) => {
        $mem.write_array($pos, &[
            $(
                $byte as Byte,
            )+
        ]);
    };
}
