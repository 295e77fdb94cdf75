use color_eyre::eyre::Result;

use aura8::memory::Byte;
use aura8::processor::Processor;
use aura8::write_instructions;
use simple_logger::SimpleLogger;

fn main() -> Result<()> {
    color_eyre::install()?; // rust error handling
    SimpleLogger::new().init().unwrap(); // logging

    let mut cpu = Processor::new();

    use aura8::processor::Instruction::*;
    let mem = &mut cpu.memory;
    write_instructions!(mem : 0 =>
        SET_A_VAL,
        123,
        JUMP,
        HALT
    );

    cpu.execute_until_halt()?;

    println!("========================");
    println!("        NVHDITZC");
    println!("Status: {:08b}", cpu.flags.status());
    println!("A: {}", cpu.a);
    println!("X: {}", cpu.x);
    println!("Y: {}", cpu.y);
    println!("Z: {}", cpu.z);
    println!("IP: {}", cpu.ip);
    println!("SP: {}", cpu.sp);

    Ok(())
}
