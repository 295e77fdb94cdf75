use color_eyre::eyre::Result;

use aura8::memory::Byte;
use aura8::processor::Processor;
use aura8::write_instructions;
use log::LevelFilter;
use simple_logger::SimpleLogger;

/// Counts the accumulator down to zero. Only A can be decremented and only
/// A can be a jump target, so the counter is parked on the stack while the
/// loop address is moved from X into A.
fn main() -> Result<()> {
    color_eyre::install()?; // rust error handling
    SimpleLogger::new()
        .with_level(LevelFilter::Debug)
        .init()
        .unwrap(); // logging

    let mut cpu = Processor::new();

    use aura8::processor::Instruction::*;
    let mem = &mut cpu.memory;
    write_instructions!(mem : 0 =>
        SET_X_VAL, 8,  // loop head address
        SET_Z_VAL, 0,  // compare target
        SET_A_VAL, 5,  // counter
        PUSH_A,
        NOP,
        PULL_A,        // loop head: A = counter
        DEC,
        IS_EQ,         // counter == 0 ?
        PUSH_A,        // park the counter
        PUSH_X,
        PULL_A,        // A = loop head address
        JUMP_FALSE,    // keep counting down
        PULL_A,        // done, A = 0
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
