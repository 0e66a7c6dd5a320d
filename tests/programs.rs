use chip8_vm::{Chip8, Chip8Error, ExecState};

fn rom(words: &[u16]) -> Vec<u8> {
    words.iter().flat_map(|w| vec![(w >> 8) as u8, *w as u8]).collect()
}

fn run(vm: &mut Chip8, steps: usize) -> Result<(), Chip8Error> {
    for _ in 0..steps {
        vm.step()?;
    }
    Ok(())
}

#[test]
fn test_count_and_draw_digit() -> Result<(), Chip8Error> {
    let program = rom(&[
        0x6000, // V0 = 0
        0x7001, // V0 += 1
        0x3005, // skip if V0 == 5
        0x1202, // loop
        0xF029, // I = glyph V0
        0x6A00, // VA = 0
        0xDAA5, // draw at VA,VA
    ]);
    let mut vm = Chip8::new(&program, || 0)?;
    run(&mut vm, 100)?;

    assert_eq!(vm.v(0), 5);
    assert_eq!(vm.i(), 25);
    assert_eq!(vm.pc(), 0x20E);
    assert_eq!(vm.v(0xF), 0);

    // 5 is F0 80 F0 10 F0
    assert!((0..4).all(|x| vm.get_pixel(x, 0)));
    assert!(vm.get_pixel(0, 1) && !vm.get_pixel(1, 1));
    assert!(vm.get_pixel(3, 3) && !vm.get_pixel(0, 3));
    assert_eq!(vm.lit_pixels().count(), 14);
    assert!(vm.take_draw_flag());
    Ok(())
}

#[test]
fn test_bcd_round_trip_through_registers() -> Result<(), Chip8Error> {
    let program = rom(&[0xA300, 0x60FE, 0xF033, 0xF265]);
    let mut vm = Chip8::new(&program, || 0)?;
    run(&mut vm, 4)?;
    assert_eq!((vm.v(0), vm.v(1), vm.v(2)), (2, 5, 4));
    assert_eq!(vm.memory()[0x300..0x303], [2, 5, 4]);
    Ok(())
}

#[test]
fn test_engines_are_independent() -> Result<(), Chip8Error> {
    let program = rom(&[0xC0FF, 0x610A]);
    let mut a = Chip8::new(&program, || 0x11)?;
    let mut b = Chip8::new(&program, || 0x22)?;
    a.step()?;
    b.step()?;
    b.step()?;
    assert_eq!(a.v(0), 0x11);
    assert_eq!(b.v(0), 0x22);
    assert_eq!(a.v(1), 0);
    assert_eq!(b.v(1), 0x0A);
    Ok(())
}

#[test]
fn test_wait_resumes_on_key_down() -> Result<(), Chip8Error> {
    let program = rom(&[0xF50A, 0x8150]);
    let mut vm = Chip8::new(&program, || 0)?;
    run(&mut vm, 5)?;
    assert_eq!(vm.state(), ExecState::WaitingForKey(5));
    assert_eq!(vm.pc(), 0x202);

    vm.key_down(7)?;
    assert!(vm.is_key_pressed(7));
    assert_eq!(vm.state(), ExecState::Running);
    vm.step()?;
    assert_eq!(vm.v(1), 7);
    Ok(())
}

#[test]
fn test_fault_reports_location() {
    let program = rom(&[0x6001, 0xE1FF]);
    let mut vm = Chip8::new(&program, || 0).unwrap();
    vm.step().unwrap();
    let err = vm.step().unwrap_err();
    assert_eq!(
        err,
        Chip8Error::InvalidOpcode {
            opcode: 0xE1FF,
            pc: 0x202
        }
    );
    assert_eq!(err.to_string(), "invalid opcode E1FF at 0x202");
    assert_eq!(vm.pc(), 0x202);
}
